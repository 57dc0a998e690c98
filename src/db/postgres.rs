use sqlx::{postgres::PgPoolOptions, PgPool};

/// Creates a PostgreSQL connection pool
///
/// Establishes a pool of database connections for efficient reuse.
/// The pool automatically manages connection lifecycle and limits.
pub async fn create_pool(database_url: &str, max_connections: u32) -> anyhow::Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(database_url)
        .await?;

    Ok(pool)
}

/// Applies the embedded schema migrations
pub async fn run_migrations(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

/// PostgreSQL-backed store for profiles, the catalog mirror, the pool and the ledger
///
/// Each concern is exposed through its own repository trait so services only
/// see the slice of the schema they work with.
#[derive(Clone)]
pub struct PgStore {
    pub(crate) pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

/// Select list producing a `GameCard` from `games g` joined with genres `ge`
/// and platforms `pl`. Callers add the joins and a `GROUP BY g.id`.
pub(crate) const GAME_CARD_COLUMNS: &str = "\
    g.id, g.title, g.release_date, g.metascore, g.cover_url, \
    COALESCE(array_agg(DISTINCT ge.name) FILTER (WHERE ge.name IS NOT NULL), '{}') AS genres, \
    COALESCE(array_agg(DISTINCT pl.name) FILTER (WHERE pl.name IS NOT NULL), '{}') AS platforms";

pub(crate) const GAME_CARD_JOINS: &str = "\
    LEFT JOIN game_genres gg ON gg.game_id = g.id \
    LEFT JOIN genres ge ON ge.id = gg.genre_id \
    LEFT JOIN game_platforms gp ON gp.game_id = g.id \
    LEFT JOIN platforms pl ON pl.id = gp.platform_id";
