use std::time::Duration;

use sqlx::{Acquire, Postgres, Transaction};

use crate::common::error::AppError;

// ---
// Helper de transação do almoxarifado
// ---
/// Abre uma transação e define um `statement_timeout` local a ela.
/// Se o banco estourar o tempo, o erro sobe com `?` e o `Drop` da transação faz o rollback.
pub(crate) async fn begin_stores_tx<'c, A>(
    db: A,
    statement_timeout: Duration,
) -> Result<Transaction<'c, Postgres>, AppError>
where
    A: Acquire<'c, Database = Postgres>,
{
    // O operador '?' converte automaticamente sqlx::Error -> AppError::DatabaseError
    let mut tx = db.begin().await?;

    // `true` = is_local: vale só até o fim desta transação
    sqlx::query("SELECT set_config('statement_timeout', $1, true)")
        .bind(statement_timeout.as_millis().to_string())
        .execute(&mut *tx)
        .await?;

    Ok(tx)
}

pub(crate) fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db_err) if db_err.is_unique_violation())
}

pub(crate) fn is_foreign_key_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db_err) if db_err.is_foreign_key_violation())
}
