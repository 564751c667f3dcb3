use crate::departments;
use sea_orm::prelude::{DateTimeWithTimeZone, *};
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "employees")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    #[sea_orm(unique)]
    pub email: String,
    pub phone: String,
    pub position: String,
    #[sea_orm(indexed)]
    pub department_id: Uuid,
    pub hire_date: DateTimeWithTimeZone,
    pub salary: f64,
    pub is_active: bool,
    #[sea_orm(unique)]
    pub employee_id: String,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "departments::Entity",
        from = "Column::DepartmentId",
        to = "departments::Column::Id",
        on_delete = "Restrict"
    )]
    Department,
}

impl Related<departments::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Department.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
