use std::sync::Arc;

use sqlx::PgPool;

use crate::{
    auth::{jwt::JwtKeys, service::AuthService, store::PgUserStore},
    config::AppConfig,
    email::{Mailer, ResendMailer},
    movies::{service::MovieService, store::PgMovieStore},
    storage::{Storage, StorageClient},
};

#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub config: Arc<AppConfig>,
    pub auth: AuthService,
    pub movies: MovieService,
    pub storage: Arc<dyn StorageClient>,
    pub mailer: Arc<dyn Mailer>,
}

impl AppState {
    pub async fn init() -> anyhow::Result<Self> {
        let config = Arc::new(AppConfig::from_env()?);

        let db = sqlx::postgres::PgPoolOptions::new()
            .max_connections(10)
            .connect(&config.database_url)
            .await?;

        let storage = Arc::new(Storage::new(&config.s3).await?) as Arc<dyn StorageClient>;
        let mailer = Arc::new(ResendMailer::new(&config.email)) as Arc<dyn Mailer>;

        Ok(Self::from_parts(db, config, storage, mailer))
    }

    pub fn from_parts(
        db: PgPool,
        config: Arc<AppConfig>,
        storage: Arc<dyn StorageClient>,
        mailer: Arc<dyn Mailer>,
    ) -> Self {
        let keys = JwtKeys::from_config(&config.jwt);
        let auth = AuthService::new(
            Arc::new(PgUserStore::new(db.clone())),
            mailer.clone(),
            keys,
        );
        let movies = MovieService::new(Arc::new(PgMovieStore::new(db.clone())));

        Self {
            db,
            config,
            auth,
            movies,
            storage,
            mailer,
        }
    }
}
