// src/config.rs

use anyhow::Context;
use sqlx::{postgres::PgPoolOptions, PgPool};
use std::{env, time::Duration};

use crate::{
    db::{GrnRepository, IssuanceRepository, ItemRepository, LedgerRepository},
    services::{
        auth::AuthService, catalog_service::CatalogService, grn_service::GrnService,
        issuance_service::IssuanceService, ledger_service::LedgerService,
    },
};

// Variáveis de ambiente lidas na inicialização
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub bind_addr: String,
    pub db_max_connections: u32,
    pub db_acquire_timeout: Duration,
    pub statement_timeout: Duration,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let database_url = env::var("DATABASE_URL").context("DATABASE_URL deve ser definida")?;
        let jwt_secret = env::var("JWT_SECRET").context("JWT_SECRET deve ser definido")?;
        let bind_addr = env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string());

        Ok(Self {
            database_url,
            jwt_secret,
            bind_addr,
            db_max_connections: parse_var("DB_MAX_CONNECTIONS", 5)?,
            db_acquire_timeout: Duration::from_secs(parse_var("DB_ACQUIRE_TIMEOUT_SECS", 3)?),
            statement_timeout: Duration::from_millis(parse_var("STORES_STATEMENT_TIMEOUT_MS", 5000)?),
        })
    }
}

fn parse_var<T>(name: &str, default: T) -> anyhow::Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{} inválida: '{}'", name, raw)),
        Err(_) => Ok(default),
    }
}

// O estado compartilhado que será acessível em toda a aplicação
#[derive(Clone)]
pub struct AppState {
    pub db_pool: PgPool,
    pub config: Config,
    pub auth_service: AuthService,
    pub catalog_service: CatalogService,
    pub grn_service: GrnService,
    pub issuance_service: IssuanceService,
    pub ledger_service: LedgerService,
}

impl AppState {
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        // Conecta ao banco de dados, usando '?' para propagar erros
        let db_pool = PgPoolOptions::new()
            .max_connections(config.db_max_connections)
            .acquire_timeout(config.db_acquire_timeout)
            .connect(&config.database_url)
            .await
            .context("Falha ao conectar ao banco de dados")?;

        tracing::info!("✅ Conexão com o banco de dados estabelecida com sucesso!");

        Ok(Self::with_pool(db_pool, config))
    }

    // --- Monta o gráfico de dependências ---
    pub fn with_pool(db_pool: PgPool, config: Config) -> Self {
        let item_repo = ItemRepository::new(db_pool.clone());
        let grn_repo = GrnRepository::new(db_pool.clone());
        let issuance_repo = IssuanceRepository::new(db_pool.clone());
        let ledger_repo = LedgerRepository::new();

        let ledger_service = LedgerService::new(item_repo.clone(), ledger_repo, config.statement_timeout);

        Self {
            auth_service: AuthService::new(config.jwt_secret.clone()),
            catalog_service: CatalogService::new(item_repo),
            grn_service: GrnService::new(grn_repo, ledger_service.clone(), config.statement_timeout),
            issuance_service: IssuanceService::new(issuance_repo, ledger_service.clone(), config.statement_timeout),
            ledger_service,
            db_pool,
            config,
        }
    }
}
