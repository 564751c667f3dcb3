use crate::employees;
use sea_orm::prelude::{DateTimeWithTimeZone, *};
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "departments")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub name: String,
    pub description: String,
    #[sea_orm(indexed)]
    pub manager_id: Option<Uuid>,
    pub location: String,
    pub is_active: bool,
    #[sea_orm(unique)]
    pub department_code: String,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

/// Only the manager link is modelled here. The reverse of
/// `employees.department_id` is queried explicitly where needed, since
/// `Related<employees::Entity>` can name a single path.
#[derive(Copy, Clone, Debug, EnumIter)]
pub enum Relation {
    Manager,
}

impl RelationTrait for Relation {
    fn def(&self) -> RelationDef {
        match self {
            Self::Manager => Entity::belongs_to(employees::Entity)
                .from(Column::ManagerId)
                .to(employees::Column::Id)
                .into(),
        }
    }
}

impl Related<employees::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Manager.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
