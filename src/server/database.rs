use chrono::{NaiveDateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::{query, query_as, FromRow};
use std::str::FromStr;
use std::sync::Arc;
use tracing::{error, info};

use crate::errors::{StockroomError, StockroomResult};

/// Table definitions, applied in order by [`Database::migrate`].
const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS products (
        id          INTEGER PRIMARY KEY AUTOINCREMENT,
        name        TEXT NOT NULL,
        price       REAL NOT NULL,
        created_at  TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS sales (
        id          INTEGER PRIMARY KEY AUTOINCREMENT,
        product_id  INTEGER NOT NULL REFERENCES products(id),
        quantity    REAL NOT NULL,
        created_at  TEXT NOT NULL
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_sales_product_id ON sales(product_id)",
    r#"
    CREATE TABLE IF NOT EXISTS purchases (
        id          INTEGER PRIMARY KEY AUTOINCREMENT,
        product_id  INTEGER NOT NULL REFERENCES products(id),
        quantity    REAL NOT NULL,
        created_at  TEXT NOT NULL
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_purchases_product_id ON purchases(product_id)",
    r#"
    CREATE TABLE IF NOT EXISTS users (
        id             INTEGER PRIMARY KEY AUTOINCREMENT,
        username       TEXT NOT NULL UNIQUE,
        email          TEXT NOT NULL UNIQUE,
        password_hash  TEXT NOT NULL,
        created_at     TEXT NOT NULL
    )
    "#,
];

/// A product row.
#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct Product {
    pub id: i64,
    pub name: String,
    pub price: f64,
    pub created_at: NaiveDateTime,
}

/// Fields of a product that an update may replace. `None` keeps the stored value.
#[derive(Debug, Clone, Default)]
pub struct ProductChanges {
    pub name: Option<String>,
    pub price: Option<f64>,
}

/// Which movement table a sale/purchase operation targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MovementKind {
    /// Outgoing stock
    Sale,
    /// Incoming stock (restocking)
    Purchase,
}

impl MovementKind {
    /// Backing table name.
    pub fn table(self) -> &'static str {
        match self {
            MovementKind::Sale => "sales",
            MovementKind::Purchase => "purchases",
        }
    }

    /// Singular JSON key used in response envelopes.
    pub fn key(self) -> &'static str {
        match self {
            MovementKind::Sale => "sale",
            MovementKind::Purchase => "purchase",
        }
    }

    /// Capitalized name used in response messages.
    pub fn label(self) -> &'static str {
        match self {
            MovementKind::Sale => "Sale",
            MovementKind::Purchase => "Purchase",
        }
    }

    fn select_sql(self) -> String {
        format!(
            "SELECT m.id, m.product_id, p.name AS product_name, m.quantity, m.created_at \
             FROM {} m LEFT JOIN products p ON p.id = m.product_id",
            self.table()
        )
    }
}

/// A sale or purchase row, joined with the name of its product.
///
/// `product_name` is `None` when the referenced product no longer exists.
#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct StockMovement {
    pub id: i64,
    pub product_id: i64,
    pub product_name: Option<String>,
    pub quantity: f64,
    pub created_at: NaiveDateTime,
}

/// Fields of a sale/purchase that an update may replace.
#[derive(Debug, Clone, Default)]
pub struct MovementChanges {
    pub product_id: Option<i64>,
    pub quantity: Option<f64>,
}

/// A user row. The password is only ever held as an Argon2 PHC string.
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub created_at: NaiveDateTime,
}

/// Values for a user about to be inserted.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password_hash: String,
}

/// Classify a sqlx failure. Constraint failures become typed errors the
/// handlers can map to client errors; everything else is logged.
fn db_error(operation: &str, e: sqlx::Error) -> StockroomError {
    if let sqlx::Error::Database(db_err) = &e {
        if db_err.is_unique_violation() {
            return StockroomError::Duplicate(db_err.message().to_string());
        }
        if db_err.is_foreign_key_violation() {
            return StockroomError::ConstraintViolation(db_err.message().to_string());
        }
    }

    error!("SQLite {operation} failed: {e}");
    StockroomError::DatabaseError(e.to_string())
}

/// SQLite-backed store for products, sales, purchases and users.
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Connect to a SQLite URL, creating the database file if it is missing.
    ///
    /// In-memory URLs get a single connection that is never recycled, since
    /// every SQLite connection opens its own private in-memory database.
    pub async fn connect(url: &str) -> StockroomResult<Arc<Self>> {
        let options = SqliteConnectOptions::from_str(url)
            .map_err(|e| StockroomError::ConfigError(format!("invalid database url: {e}")))?
            .create_if_missing(true)
            .foreign_keys(true);

        let pool_options = if url.contains(":memory:") {
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new().max_connections(5)
        };

        let pool = pool_options.connect_with(options).await.map_err(|e| {
            error!("Failed to connect to SQLite: {e}");
            StockroomError::DatabaseError(format!("failed to connect to SQLite: {e}"))
        })?;

        Ok(Arc::new(Database { pool }))
    }

    /// Create any missing tables. Safe to run on every startup.
    pub async fn migrate(&self) -> StockroomResult<()> {
        for statement in SCHEMA {
            query(statement)
                .execute(&self.pool)
                .await
                .map_err(|e| db_error("migrate", e))?;
        }

        info!("Database schema is up to date");
        Ok(())
    }

    /// Check that the database answers a trivial query.
    pub async fn ping(&self) -> bool {
        query("SELECT 1").execute(&self.pool).await.is_ok()
    }

    // ------------------------------------------------------------------
    // Products
    // ------------------------------------------------------------------

    /// Insert a product and return it with its assigned id.
    pub async fn insert_product(&self, name: &str, price: f64) -> StockroomResult<Product> {
        let created_at = Utc::now().naive_utc();

        let id = query("INSERT INTO products (name, price, created_at) VALUES (?, ?, ?)")
            .bind(name)
            .bind(price)
            .bind(created_at)
            .execute(&self.pool)
            .await
            .map_err(|e| db_error("insert_product", e))?
            .last_insert_rowid();

        Ok(Product {
            id,
            name: name.to_string(),
            price,
            created_at,
        })
    }

    /// Fetch a product by id.
    ///
    /// Returns:
    /// - `Ok(Some(Product))` if found
    /// - `Ok(None)` if not found
    /// - `Err(StockroomError::DatabaseError)` on DB failure
    pub async fn get_product(&self, id: i64) -> StockroomResult<Option<Product>> {
        query_as::<_, Product>("SELECT id, name, price, created_at FROM products WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| db_error("get_product", e))
    }

    /// List all products ordered by id.
    pub async fn list_products(&self) -> StockroomResult<Vec<Product>> {
        query_as::<_, Product>("SELECT id, name, price, created_at FROM products ORDER BY id")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| db_error("list_products", e))
    }

    /// Apply a partial update and return the stored result, or `None` if the
    /// product does not exist.
    pub async fn update_product(
        &self,
        id: i64,
        changes: ProductChanges,
    ) -> StockroomResult<Option<Product>> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| db_error("update_product", e))?;

        let rows_affected = query(
            "UPDATE products \
                 SET name = COALESCE(?, name), price = COALESCE(?, price) \
                 WHERE id = ?",
        )
        .bind(changes.name)
        .bind(changes.price)
        .bind(id)
        .execute(&mut *tx)
        .await
        .map_err(|e| db_error("update_product", e))?
        .rows_affected();

        if rows_affected == 0 {
            return Ok(None);
        }

        let product =
            query_as::<_, Product>("SELECT id, name, price, created_at FROM products WHERE id = ?")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await
                .map_err(|e| db_error("update_product", e))?;

        tx.commit()
            .await
            .map_err(|e| db_error("update_product", e))?;

        Ok(product)
    }

    /// Delete a product.
    ///
    /// Returns `Ok(false)` if no such product exists, and
    /// `Err(StockroomError::ConstraintViolation)` while sales or purchases
    /// still reference it.
    pub async fn delete_product(&self, id: i64) -> StockroomResult<bool> {
        let rows_affected = query("DELETE FROM products WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| db_error("delete_product", e))?
            .rows_affected();

        Ok(rows_affected > 0)
    }

    // ------------------------------------------------------------------
    // Sales and purchases
    // ------------------------------------------------------------------

    /// Record a sale or purchase.
    ///
    /// An unknown `product_id` is rejected by the foreign key with
    /// `StockroomError::ConstraintViolation`.
    pub async fn insert_movement(
        &self,
        kind: MovementKind,
        product_id: i64,
        quantity: f64,
    ) -> StockroomResult<StockMovement> {
        let created_at = Utc::now().naive_utc();
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| db_error("insert_movement", e))?;

        let sql = format!(
            "INSERT INTO {} (product_id, quantity, created_at) VALUES (?, ?, ?)",
            kind.table()
        );
        let id = query(&sql)
            .bind(product_id)
            .bind(quantity)
            .bind(created_at)
            .execute(&mut *tx)
            .await
            .map_err(|e| db_error("insert_movement", e))?
            .last_insert_rowid();

        let sql = format!("{} WHERE m.id = ?", kind.select_sql());
        let movement = query_as::<_, StockMovement>(&sql)
            .bind(id)
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| db_error("insert_movement", e))?;

        tx.commit()
            .await
            .map_err(|e| db_error("insert_movement", e))?;

        Ok(movement)
    }

    /// Fetch a sale or purchase by id.
    pub async fn get_movement(
        &self,
        kind: MovementKind,
        id: i64,
    ) -> StockroomResult<Option<StockMovement>> {
        let sql = format!("{} WHERE m.id = ?", kind.select_sql());
        query_as::<_, StockMovement>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| db_error("get_movement", e))
    }

    /// List all sales or purchases ordered by id.
    pub async fn list_movements(&self, kind: MovementKind) -> StockroomResult<Vec<StockMovement>> {
        let sql = format!("{} ORDER BY m.id", kind.select_sql());
        query_as::<_, StockMovement>(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| db_error("list_movements", e))
    }

    /// Apply a partial update to a sale or purchase.
    pub async fn update_movement(
        &self,
        kind: MovementKind,
        id: i64,
        changes: MovementChanges,
    ) -> StockroomResult<Option<StockMovement>> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| db_error("update_movement", e))?;

        let sql = format!(
            "UPDATE {} \
                 SET product_id = COALESCE(?, product_id), quantity = COALESCE(?, quantity) \
                 WHERE id = ?",
            kind.table()
        );
        let rows_affected = query(&sql)
            .bind(changes.product_id)
            .bind(changes.quantity)
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(|e| db_error("update_movement", e))?
            .rows_affected();

        if rows_affected == 0 {
            return Ok(None);
        }

        let sql = format!("{} WHERE m.id = ?", kind.select_sql());
        let movement = query_as::<_, StockMovement>(&sql)
            .bind(id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| db_error("update_movement", e))?;

        tx.commit()
            .await
            .map_err(|e| db_error("update_movement", e))?;

        Ok(movement)
    }

    /// Delete a sale or purchase. Returns `Ok(false)` if it does not exist.
    pub async fn delete_movement(&self, kind: MovementKind, id: i64) -> StockroomResult<bool> {
        let sql = format!("DELETE FROM {} WHERE id = ?", kind.table());
        let rows_affected = query(&sql)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| db_error("delete_movement", e))?
            .rows_affected();

        Ok(rows_affected > 0)
    }

    // ------------------------------------------------------------------
    // Users
    // ------------------------------------------------------------------

    /// Insert a user. A taken username or email yields `StockroomError::Duplicate`.
    pub async fn insert_user(&self, user: NewUser) -> StockroomResult<User> {
        let created_at = Utc::now().naive_utc();

        let id = query(
            "INSERT INTO users (username, email, password_hash, created_at) VALUES (?, ?, ?, ?)",
        )
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| db_error("insert_user", e))?
        .last_insert_rowid();

        Ok(User {
            id,
            username: user.username,
            email: user.email,
            password_hash: user.password_hash,
            created_at,
        })
    }

    /// Whether any user already holds this username or email.
    pub async fn user_exists(&self, username: &str, email: &str) -> StockroomResult<bool> {
        let row: Option<(i64,)> =
            query_as("SELECT id FROM users WHERE username = ? OR email = ? LIMIT 1")
                .bind(username)
                .bind(email)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| db_error("user_exists", e))?;

        Ok(row.is_some())
    }

    /// Look up a user by email.
    pub async fn find_user_by_email(&self, email: &str) -> StockroomResult<Option<User>> {
        query_as::<_, User>(
            "SELECT id, username, email, password_hash, created_at FROM users WHERE email = ?",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("find_user_by_email", e))
    }

    /// Look up a user by username.
    pub async fn find_user_by_username(&self, username: &str) -> StockroomResult<Option<User>> {
        query_as::<_, User>(
            "SELECT id, username, email, password_hash, created_at FROM users WHERE username = ?",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("find_user_by_username", e))
    }

    /// List all users ordered by id.
    pub async fn list_users(&self) -> StockroomResult<Vec<User>> {
        query_as::<_, User>(
            "SELECT id, username, email, password_hash, created_at FROM users ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("list_users", e))
    }
}
