//! Department records.

use chrono::{DateTime, Utc};
use entity::{departments, employees};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, DatabaseConnection, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, Set, TransactionTrait, prelude::DateTimeWithTimeZone,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

use crate::{
    employee::contains_ci,
    error::{HrError, HrResult, UniqueField, is_foreign_key_violation, map_write_error},
    lenient,
    validate::FieldErrors,
};

const ENTITY: &str = "Department";
const TABLE: &str = "departments";

const NAME: UniqueField = UniqueField {
    column: "name",
    field: "name",
};
const CODE: UniqueField = UniqueField {
    column: "department_code",
    field: "departmentCode",
};

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewDepartment {
    pub name: Option<String>,
    pub description: Option<String>,
    #[serde(default, deserialize_with = "lenient::reference")]
    pub manager: Option<Uuid>,
    pub location: Option<String>,
    #[serde(default, deserialize_with = "lenient::flag")]
    pub is_active: Option<bool>,
    pub department_code: Option<String>,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DepartmentPatch {
    pub name: Option<String>,
    pub description: Option<String>,
    /// `Some(None)` removes the manager.
    #[serde(default, deserialize_with = "lenient::reference_patch")]
    pub manager: Option<Option<Uuid>>,
    pub location: Option<String>,
    #[serde(default, deserialize_with = "lenient::flag")]
    pub is_active: Option<bool>,
    pub department_code: Option<String>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct DepartmentFilter {
    /// Case-insensitive substring of name, code or description.
    pub q: Option<String>,
    #[serde(default, deserialize_with = "lenient::flag")]
    pub active: Option<bool>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManagerSummary {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
}

impl From<employees::Model> for ManagerSummary {
    fn from(model: employees::Model) -> Self {
        Self {
            id: model.id,
            first_name: model.first_name,
            last_name: model.last_name,
            email: model.email,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DepartmentView {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub manager: Option<ManagerSummary>,
    pub location: String,
    pub is_active: bool,
    pub department_code: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl DepartmentView {
    fn from_models(model: departments::Model, manager: Option<employees::Model>) -> Self {
        Self {
            id: model.id,
            name: model.name,
            description: model.description,
            manager: manager.map(ManagerSummary::from),
            location: model.location,
            is_active: model.is_active,
            department_code: model.department_code,
            created_at: model.created_at.with_timezone(&Utc),
            updated_at: model.updated_at.with_timezone(&Utc),
        }
    }
}

struct ValidDepartment {
    name: String,
    description: String,
    manager: Option<Uuid>,
    location: String,
    is_active: bool,
    department_code: String,
}

impl NewDepartment {
    fn validate(self) -> HrResult<ValidDepartment> {
        let mut errors = FieldErrors::default();
        let name = errors.required_text("name", self.name.as_deref());
        let description = errors.required_text("description", self.description.as_deref());
        let location = errors.required_text("location", self.location.as_deref());
        let department_code =
            errors.required_text("departmentCode", self.department_code.as_deref());
        errors.finish()?;

        match (name, description, location, department_code) {
            (Some(name), Some(description), Some(location), Some(department_code)) => {
                Ok(ValidDepartment {
                    name,
                    description,
                    manager: self.manager,
                    location,
                    is_active: self.is_active.unwrap_or(true),
                    department_code,
                })
            }
            _ => Err(HrError::validation("department is incomplete")),
        }
    }
}

struct ValidPatch {
    name: Option<String>,
    description: Option<String>,
    manager: Option<Option<Uuid>>,
    location: Option<String>,
    is_active: Option<bool>,
    department_code: Option<String>,
}

impl DepartmentPatch {
    fn validate(self) -> HrResult<ValidPatch> {
        let mut errors = FieldErrors::default();
        let name = errors.changed_text("name", self.name.as_deref());
        let description = errors.changed_text("description", self.description.as_deref());
        let location = errors.changed_text("location", self.location.as_deref());
        let department_code =
            errors.changed_text("departmentCode", self.department_code.as_deref());
        errors.finish()?;

        Ok(ValidPatch {
            name,
            description,
            manager: self.manager,
            location,
            is_active: self.is_active,
            department_code,
        })
    }
}

/// Validated CRUD over the `departments` table.
#[derive(Clone, Debug)]
pub struct DepartmentStore {
    db: DatabaseConnection,
}

impl DepartmentStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn create(&self, input: NewDepartment) -> HrResult<DepartmentView> {
        let valid = input.validate()?;
        let manager = match valid.manager {
            Some(id) => Some(find_employee(&self.db, id).await?),
            None => None,
        };
        self.ensure_unique(NAME, &valid.name, None).await?;
        self.ensure_unique(CODE, &valid.department_code, None).await?;

        let now: DateTimeWithTimeZone = Utc::now().into();
        let id = Uuid::new_v4();
        let model = departments::ActiveModel {
            id: Set(id),
            name: Set(valid.name.clone()),
            description: Set(valid.description),
            manager_id: Set(valid.manager),
            location: Set(valid.location),
            is_active: Set(valid.is_active),
            department_code: Set(valid.department_code.clone()),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&self.db)
        .await
        .map_err(|err| {
            map_write_error(
                err,
                ENTITY,
                TABLE,
                &[(NAME, &valid.name), (CODE, &valid.department_code)],
                None,
            )
        })?;

        info!(department.id = %id, department.code = %model.department_code, "department created");
        Ok(DepartmentView::from_models(model, manager))
    }

    pub async fn get(&self, id: Uuid) -> HrResult<DepartmentView> {
        let (model, manager) = departments::Entity::find_by_id(id)
            .find_also_related(employees::Entity)
            .one(&self.db)
            .await?
            .ok_or(HrError::NotFound { entity: ENTITY, id })?;
        Ok(DepartmentView::from_models(model, manager))
    }

    pub async fn update(&self, id: Uuid, patch: DepartmentPatch) -> HrResult<DepartmentView> {
        let valid = patch.validate()?;
        let existing = departments::Entity::find_by_id(id)
            .one(&self.db)
            .await?
            .ok_or(HrError::NotFound { entity: ENTITY, id })?;

        if let Some(Some(manager)) = valid.manager {
            find_employee(&self.db, manager).await?;
        }
        if let Some(name) = &valid.name {
            self.ensure_unique(NAME, name, Some(id)).await?;
        }
        if let Some(code) = &valid.department_code {
            self.ensure_unique(CODE, code, Some(id)).await?;
        }

        let name = valid.name.clone().unwrap_or_default();
        let code = valid.department_code.clone().unwrap_or_default();
        let mut active: departments::ActiveModel = existing.into();
        if let Some(name) = valid.name {
            active.name = Set(name);
        }
        if let Some(description) = valid.description {
            active.description = Set(description);
        }
        if let Some(manager) = valid.manager {
            active.manager_id = Set(manager);
        }
        if let Some(location) = valid.location {
            active.location = Set(location);
        }
        if let Some(is_active) = valid.is_active {
            active.is_active = Set(is_active);
        }
        if let Some(code) = valid.department_code {
            active.department_code = Set(code);
        }
        active.updated_at = Set(Utc::now().into());

        let model = active.update(&self.db).await.map_err(|err| {
            map_write_error(err, ENTITY, TABLE, &[(NAME, &name), (CODE, &code)], None)
        })?;
        let manager = match model.manager_id {
            Some(manager_id) => employees::Entity::find_by_id(manager_id)
                .one(&self.db)
                .await?,
            None => None,
        };

        info!(department.id = %id, "department updated");
        Ok(DepartmentView::from_models(model, manager))
    }

    /// Hard delete, refused while any employee still belongs to the
    /// department.
    pub async fn delete(&self, id: Uuid) -> HrResult<()> {
        let txn = self.db.begin().await?;
        departments::Entity::find_by_id(id)
            .one(&txn)
            .await?
            .ok_or(HrError::NotFound { entity: ENTITY, id })?;

        let members = employees::Entity::find()
            .filter(employees::Column::DepartmentId.eq(id))
            .count(&txn)
            .await?;
        if members > 0 {
            debug!(department.id = %id, members, "department delete refused");
            return Err(HrError::StillReferenced {
                entity: ENTITY,
                id,
                count: members,
            });
        }

        match departments::Entity::delete_by_id(id).exec(&txn).await {
            Ok(_) => {}
            Err(err) if is_foreign_key_violation(&err) => {
                // An employee joined after the count; the foreign key held.
                txn.rollback().await?;
                let members = employees::Entity::find()
                    .filter(employees::Column::DepartmentId.eq(id))
                    .count(&self.db)
                    .await?;
                debug!(department.id = %id, members, "department delete refused by foreign key");
                return Err(HrError::StillReferenced {
                    entity: ENTITY,
                    id,
                    count: members.max(1),
                });
            }
            Err(err) => return Err(err.into()),
        }
        txn.commit().await?;
        info!(department.id = %id, "department deleted");
        Ok(())
    }

    /// Oldest first.
    pub async fn list(&self, filter: DepartmentFilter) -> HrResult<Vec<DepartmentView>> {
        let mut query = departments::Entity::find().find_also_related(employees::Entity);
        if let Some(needle) = filter.q.as_deref().map(str::trim).filter(|q| !q.is_empty()) {
            let backend = self.db.get_database_backend();
            query = query.filter(
                Condition::any()
                    .add(contains_ci(backend, departments::Column::Name, needle))
                    .add(contains_ci(backend, departments::Column::DepartmentCode, needle))
                    .add(contains_ci(backend, departments::Column::Description, needle)),
            );
        }
        if let Some(active) = filter.active {
            query = query.filter(departments::Column::IsActive.eq(active));
        }

        let rows = query
            .order_by_asc(departments::Column::CreatedAt)
            .order_by_asc(departments::Column::Id)
            .all(&self.db)
            .await?;
        Ok(rows
            .into_iter()
            .map(|(model, manager)| DepartmentView::from_models(model, manager))
            .collect())
    }

    async fn ensure_unique(
        &self,
        unique: UniqueField,
        value: &str,
        except: Option<Uuid>,
    ) -> HrResult<()> {
        let column = if unique.column == NAME.column {
            departments::Column::Name
        } else {
            departments::Column::DepartmentCode
        };
        let mut query = departments::Entity::find().filter(column.eq(value));
        if let Some(id) = except {
            query = query.filter(departments::Column::Id.ne(id));
        }
        if query.count(&self.db).await? > 0 {
            debug!(field = unique.field, value, "department uniqueness check failed");
            return Err(HrError::Duplicate {
                entity: ENTITY,
                field: unique.field,
                value: value.to_string(),
            });
        }
        Ok(())
    }
}

async fn find_employee(db: &DatabaseConnection, id: Uuid) -> HrResult<employees::Model> {
    employees::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or(HrError::MissingReference {
            entity: "Employee",
            id,
        })
}
