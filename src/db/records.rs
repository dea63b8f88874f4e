//! Generic CRUD helpers shared by the repositories and the model wrappers.
//!
//! Every query goes through sea-orm with bound parameters; the set of
//! tables is closed over the entity types in `crate::entities`, so no
//! table or column identifier ever comes from user input.

use sea_orm::{
    ActiveModelBehavior, ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait,
    IntoActiveModel, PrimaryKeyTrait, QueryFilter, Value,
};

/// Inserts a fully populated active model and returns the stored row,
/// including the id the database assigned.
pub async fn create<A>(
    conn: &DatabaseConnection,
    row: A,
) -> Result<<A::Entity as EntityTrait>::Model, DbErr>
where
    A: ActiveModelTrait + ActiveModelBehavior + Send,
    <A::Entity as EntityTrait>::Model: IntoActiveModel<A>,
{
    row.insert(conn).await
}

pub async fn read_by_id<E>(conn: &DatabaseConnection, id: i32) -> Result<Option<E::Model>, DbErr>
where
    E: EntityTrait,
    <E::PrimaryKey as PrimaryKeyTrait>::ValueType: From<i32>,
{
    E::find_by_id(id).one(conn).await
}

/// Persists the columns marked changed on `row`. The primary key must be
/// present; updating a row that no longer exists surfaces as
/// `DbErr::RecordNotUpdated`.
pub async fn update<A>(
    conn: &DatabaseConnection,
    row: A,
) -> Result<<A::Entity as EntityTrait>::Model, DbErr>
where
    A: ActiveModelTrait + ActiveModelBehavior + Send,
    <A::Entity as EntityTrait>::Model: IntoActiveModel<A>,
{
    row.update(conn).await
}

/// Deletes by primary key and reports how many rows went away (0 or 1).
pub async fn remove<E>(conn: &DatabaseConnection, id: i32) -> Result<u64, DbErr>
where
    E: EntityTrait,
    <E::PrimaryKey as PrimaryKeyTrait>::ValueType: From<i32>,
{
    let result = E::delete_by_id(id).exec(conn).await?;
    Ok(result.rows_affected)
}

/// Equality filter on a single column.
pub async fn find_by<E, V>(
    conn: &DatabaseConnection,
    column: E::Column,
    value: V,
) -> Result<Vec<E::Model>, DbErr>
where
    E: EntityTrait,
    V: Into<Value>,
{
    E::find().filter(column.eq(value)).all(conn).await
}
