//! Initial database migration.
//!
//! Creates the ledger tables: users, accounts, transactions, and the
//! append-only transaction history.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();

        db.execute_unprepared(ENUMS_SQL).await?;
        db.execute_unprepared(USERS_SQL).await?;
        db.execute_unprepared(ACCOUNTS_SQL).await?;
        db.execute_unprepared(TRANSACTIONS_SQL).await?;
        db.execute_unprepared(TRANSACTION_HISTORY_SQL).await?;
        db.execute_unprepared(INDEXES_SQL).await?;
        db.execute_unprepared(HISTORY_GUARD_SQL).await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();
        db.execute_unprepared(DROP_ALL_SQL).await?;
        Ok(())
    }
}

// ============================================================
// SQL CONSTANTS
// ============================================================

const ENUMS_SQL: &str = r"
CREATE TYPE transaction_kind AS ENUM (
    'income',
    'expense',
    'transfer',
    'conversion'
);

CREATE TYPE history_action AS ENUM (
    'create',
    'edit',
    'delete',
    'restore'
);
";

const USERS_SQL: &str = r"
CREATE TABLE users (
    id UUID PRIMARY KEY,
    email TEXT NOT NULL UNIQUE,
    default_currency CHAR(3) NOT NULL DEFAULT 'USD',
    created_at TIMESTAMPTZ NOT NULL DEFAULT now()
);
";

const ACCOUNTS_SQL: &str = r"
CREATE TABLE accounts (
    id UUID PRIMARY KEY,
    user_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    name TEXT NOT NULL,
    currency CHAR(3) NOT NULL,
    balance NUMERIC(19, 4) NOT NULL DEFAULT 0,
    is_active BOOLEAN NOT NULL DEFAULT TRUE,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),

    UNIQUE (user_id, name)
);
";

const TRANSACTIONS_SQL: &str = r"
CREATE TABLE transactions (
    id UUID PRIMARY KEY,
    user_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    kind transaction_kind NOT NULL,
    amount NUMERIC(19, 4) NOT NULL CHECK (amount > 0),
    currency CHAR(3) NOT NULL,
    converted_amount NUMERIC(19, 4) CHECK (converted_amount IS NULL OR converted_amount > 0),
    exchange_rate NUMERIC(19, 8) CHECK (exchange_rate IS NULL OR exchange_rate > 0),
    account_id UUID REFERENCES accounts(id),
    destination_account_id UUID REFERENCES accounts(id),
    category TEXT,
    description TEXT,
    transaction_date DATE NOT NULL,
    deleted_at TIMESTAMPTZ,
    deleted_reason TEXT,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),

    CHECK (destination_account_id IS NULL OR destination_account_id <> account_id),
    CHECK (deleted_reason IS NULL OR deleted_at IS NOT NULL)
);
";

const TRANSACTION_HISTORY_SQL: &str = r"
CREATE TABLE transaction_history (
    id UUID PRIMARY KEY,
    transaction_id UUID NOT NULL REFERENCES transactions(id) ON DELETE CASCADE,
    user_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    action history_action NOT NULL,
    kind transaction_kind NOT NULL,
    amount NUMERIC(19, 4) NOT NULL,
    currency CHAR(3) NOT NULL,
    converted_amount NUMERIC(19, 4),
    exchange_rate NUMERIC(19, 8),
    account_id UUID,
    destination_account_id UUID,
    category TEXT,
    description TEXT,
    transaction_date DATE NOT NULL,
    reason TEXT,
    recorded_at TIMESTAMPTZ NOT NULL DEFAULT now()
);
";

const INDEXES_SQL: &str = r"
CREATE INDEX idx_accounts_user ON accounts(user_id);
CREATE INDEX idx_transactions_user_active
    ON transactions(user_id, transaction_date DESC)
    WHERE deleted_at IS NULL;
CREATE INDEX idx_transactions_user_deleted
    ON transactions(user_id, deleted_at DESC)
    WHERE deleted_at IS NOT NULL;
CREATE INDEX idx_history_user_recorded ON transaction_history(user_id, recorded_at DESC);
CREATE INDEX idx_history_transaction ON transaction_history(transaction_id);
";

// The history table is append-only: reject updates and deletes at the
// database level so no code path can rewrite the audit trail.
const HISTORY_GUARD_SQL: &str = r"
CREATE OR REPLACE FUNCTION reject_history_mutation()
RETURNS TRIGGER AS $$
BEGIN
    RAISE EXCEPTION 'transaction_history is append-only';
END;
$$ LANGUAGE plpgsql;

CREATE TRIGGER transaction_history_append_only
    BEFORE UPDATE OR DELETE ON transaction_history
    FOR EACH ROW EXECUTE FUNCTION reject_history_mutation();
";

const DROP_ALL_SQL: &str = r"
DROP TABLE IF EXISTS transaction_history CASCADE;
DROP TABLE IF EXISTS transactions CASCADE;
DROP TABLE IF EXISTS accounts CASCADE;
DROP TABLE IF EXISTS users CASCADE;
DROP FUNCTION IF EXISTS reject_history_mutation CASCADE;
DROP TYPE IF EXISTS history_action;
DROP TYPE IF EXISTS transaction_kind;
";
