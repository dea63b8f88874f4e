use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "packages")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub user_id: i32,

    #[sea_orm(unique)]
    pub name: String,

    /// Category ordinal, see `models::package::Category`
    pub category: i32,

    pub description: String,

    pub input: String,

    pub output: String,

    pub markdown: String,

    pub num_api_calls: i32,

    pub last_updated: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::UserId",
        to = "super::users::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Users,
    #[sea_orm(has_many = "super::package_flags::Entity")]
    PackageFlags,
}

impl Related<super::users::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Users.def()
    }
}

impl Related<super::package_flags::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::PackageFlags.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
