//! Employee records.
//!
//! `department` is stored as a bare id and resolved into a
//! [`DepartmentSummary`] on every read. Writes check that the department
//! exists and that `email` / `employeeId` are unused; the unique indexes back
//! those checks up when two writers race.

use chrono::{DateTime, Utc};
use entity::{departments, employees};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, DatabaseConnection, DbBackend,
    EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, Set, TransactionTrait,
    prelude::DateTimeWithTimeZone,
    sea_query::{Expr, Func, LikeExpr, SimpleExpr},
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

use crate::{
    error::{HrError, HrResult, UniqueField, map_write_error},
    lenient,
    validate::FieldErrors,
};

const ENTITY: &str = "Employee";
const TABLE: &str = "employees";

const EMAIL: UniqueField = UniqueField {
    column: "email",
    field: "email",
};
const EMPLOYEE_ID: UniqueField = UniqueField {
    column: "employee_id",
    field: "employeeId",
};

/// Payload for [`EmployeeStore::create`]. Every field is optional at the type
/// level so that missing values surface as one validation error.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewEmployee {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub position: Option<String>,
    #[serde(default, deserialize_with = "lenient::reference")]
    pub department: Option<Uuid>,
    /// Defaults to the creation time.
    #[serde(default, deserialize_with = "lenient::timestamp")]
    pub hire_date: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "lenient::number")]
    pub salary: Option<f64>,
    /// Defaults to `true`.
    #[serde(default, deserialize_with = "lenient::flag")]
    pub is_active: Option<bool>,
    pub employee_id: Option<String>,
}

/// Payload for [`EmployeeStore::update`]. `None` leaves a field untouched.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmployeePatch {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub position: Option<String>,
    /// `Some(None)` is an attempt to clear a required reference and fails.
    #[serde(default, deserialize_with = "lenient::reference_patch")]
    pub department: Option<Option<Uuid>>,
    #[serde(default, deserialize_with = "lenient::timestamp")]
    pub hire_date: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "lenient::number")]
    pub salary: Option<f64>,
    #[serde(default, deserialize_with = "lenient::flag")]
    pub is_active: Option<bool>,
    pub employee_id: Option<String>,
}

/// Narrows [`EmployeeStore::list`].
#[derive(Clone, Debug, Default, Deserialize)]
pub struct EmployeeFilter {
    /// Case-insensitive substring of first name, last name, email or
    /// employee id.
    pub q: Option<String>,
    #[serde(default, deserialize_with = "lenient::reference")]
    pub department: Option<Uuid>,
    #[serde(default, deserialize_with = "lenient::flag")]
    pub active: Option<bool>,
}

/// The department fields embedded in an employee read.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DepartmentSummary {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub name: String,
    pub department_code: String,
    pub location: String,
}

impl From<departments::Model> for DepartmentSummary {
    fn from(model: departments::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            department_code: model.department_code,
            location: model.location,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmployeeView {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    pub position: String,
    /// `None` when the stored department no longer exists.
    pub department: Option<DepartmentSummary>,
    pub hire_date: DateTime<Utc>,
    pub salary: f64,
    pub is_active: bool,
    pub employee_id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl EmployeeView {
    fn from_models(model: employees::Model, department: Option<departments::Model>) -> Self {
        Self {
            id: model.id,
            first_name: model.first_name,
            last_name: model.last_name,
            email: model.email,
            phone: model.phone,
            position: model.position,
            department: department.map(DepartmentSummary::from),
            hire_date: model.hire_date.with_timezone(&Utc),
            salary: model.salary,
            is_active: model.is_active,
            employee_id: model.employee_id,
            created_at: model.created_at.with_timezone(&Utc),
            updated_at: model.updated_at.with_timezone(&Utc),
        }
    }
}

/// Validated, normalised create payload.
struct ValidEmployee {
    first_name: String,
    last_name: String,
    email: String,
    phone: String,
    position: String,
    department: Uuid,
    hire_date: Option<DateTime<Utc>>,
    salary: f64,
    is_active: bool,
    employee_id: String,
}

impl NewEmployee {
    fn validate(self) -> HrResult<ValidEmployee> {
        let mut errors = FieldErrors::default();
        let first_name = errors.required_text("firstName", self.first_name.as_deref());
        let last_name = errors.required_text("lastName", self.last_name.as_deref());
        let email = errors.email("email", self.email.as_deref());
        let phone = errors.required_text("phone", self.phone.as_deref());
        let position = errors.required_text("position", self.position.as_deref());
        if self.department.is_none() {
            errors.required("department");
        }
        let salary = errors.salary("salary", self.salary);
        let employee_id = errors.required_text("employeeId", self.employee_id.as_deref());
        errors.finish()?;

        match (
            first_name,
            last_name,
            email,
            phone,
            position,
            self.department,
            salary,
            employee_id,
        ) {
            (
                Some(first_name),
                Some(last_name),
                Some(email),
                Some(phone),
                Some(position),
                Some(department),
                Some(salary),
                Some(employee_id),
            ) => Ok(ValidEmployee {
                first_name,
                last_name,
                email,
                phone,
                position,
                department,
                hire_date: self.hire_date,
                salary,
                is_active: self.is_active.unwrap_or(true),
                employee_id,
            }),
            _ => Err(HrError::validation("employee is incomplete")),
        }
    }
}

/// Validated, normalised patch. Same shape as [`EmployeePatch`] with the
/// required reference unwrapped.
#[derive(Default)]
struct ValidPatch {
    first_name: Option<String>,
    last_name: Option<String>,
    email: Option<String>,
    phone: Option<String>,
    position: Option<String>,
    department: Option<Uuid>,
    hire_date: Option<DateTime<Utc>>,
    salary: Option<f64>,
    is_active: Option<bool>,
    employee_id: Option<String>,
}

impl EmployeePatch {
    fn validate(self) -> HrResult<ValidPatch> {
        let mut errors = FieldErrors::default();
        let first_name = errors.changed_text("firstName", self.first_name.as_deref());
        let last_name = errors.changed_text("lastName", self.last_name.as_deref());
        let email = match self.email.as_deref() {
            Some(raw) => errors.email("email", Some(raw)),
            None => None,
        };
        let phone = errors.changed_text("phone", self.phone.as_deref());
        let position = errors.changed_text("position", self.position.as_deref());
        let department = match self.department {
            Some(None) => {
                errors.required("department");
                None
            }
            Some(Some(id)) => Some(id),
            None => None,
        };
        let salary = match self.salary {
            Some(amount) => errors.salary("salary", Some(amount)),
            None => None,
        };
        let employee_id = errors.changed_text("employeeId", self.employee_id.as_deref());
        errors.finish()?;

        Ok(ValidPatch {
            first_name,
            last_name,
            email,
            phone,
            position,
            department,
            hire_date: self.hire_date,
            salary,
            is_active: self.is_active,
            employee_id,
        })
    }
}

/// Validated CRUD over the `employees` table.
#[derive(Clone, Debug)]
pub struct EmployeeStore {
    db: DatabaseConnection,
}

impl EmployeeStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn create(&self, input: NewEmployee) -> HrResult<EmployeeView> {
        let valid = input.validate()?;
        let department = find_department(&self.db, valid.department).await?;
        self.ensure_unique(EMAIL, &valid.email, None).await?;
        self.ensure_unique(EMPLOYEE_ID, &valid.employee_id, None).await?;

        let now: DateTimeWithTimeZone = Utc::now().into();
        let id = Uuid::new_v4();
        let model = employees::ActiveModel {
            id: Set(id),
            first_name: Set(valid.first_name),
            last_name: Set(valid.last_name),
            email: Set(valid.email.clone()),
            phone: Set(valid.phone),
            position: Set(valid.position),
            department_id: Set(valid.department),
            hire_date: Set(valid.hire_date.map(Into::into).unwrap_or(now)),
            salary: Set(valid.salary),
            is_active: Set(valid.is_active),
            employee_id: Set(valid.employee_id.clone()),
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
                &[(EMAIL, &valid.email), (EMPLOYEE_ID, &valid.employee_id)],
                Some(("Department", valid.department)),
            )
        })?;

        info!(employee.id = %id, employee.code = %model.employee_id, "employee created");
        Ok(EmployeeView::from_models(model, Some(department)))
    }

    pub async fn get(&self, id: Uuid) -> HrResult<EmployeeView> {
        let (model, department) = employees::Entity::find_by_id(id)
            .find_also_related(departments::Entity)
            .one(&self.db)
            .await?
            .ok_or(HrError::NotFound { entity: ENTITY, id })?;
        Ok(EmployeeView::from_models(model, department))
    }

    pub async fn update(&self, id: Uuid, patch: EmployeePatch) -> HrResult<EmployeeView> {
        let valid = patch.validate()?;
        let existing = employees::Entity::find_by_id(id)
            .one(&self.db)
            .await?
            .ok_or(HrError::NotFound { entity: ENTITY, id })?;

        if let Some(department) = valid.department {
            find_department(&self.db, department).await?;
        }
        if let Some(email) = &valid.email {
            self.ensure_unique(EMAIL, email, Some(id)).await?;
        }
        if let Some(employee_id) = &valid.employee_id {
            self.ensure_unique(EMPLOYEE_ID, employee_id, Some(id)).await?;
        }

        let email = valid.email.clone().unwrap_or_default();
        let employee_id = valid.employee_id.clone().unwrap_or_default();
        let department_id = valid.department.unwrap_or(existing.department_id);
        let mut active: employees::ActiveModel = existing.into();
        if let Some(first_name) = valid.first_name {
            active.first_name = Set(first_name);
        }
        if let Some(last_name) = valid.last_name {
            active.last_name = Set(last_name);
        }
        if let Some(email) = valid.email {
            active.email = Set(email);
        }
        if let Some(phone) = valid.phone {
            active.phone = Set(phone);
        }
        if let Some(position) = valid.position {
            active.position = Set(position);
        }
        if let Some(department) = valid.department {
            active.department_id = Set(department);
        }
        if let Some(hire_date) = valid.hire_date {
            active.hire_date = Set(hire_date.into());
        }
        if let Some(salary) = valid.salary {
            active.salary = Set(salary);
        }
        if let Some(is_active) = valid.is_active {
            active.is_active = Set(is_active);
        }
        if let Some(employee_id) = valid.employee_id {
            active.employee_id = Set(employee_id);
        }
        active.updated_at = Set(Utc::now().into());

        let model = active.update(&self.db).await.map_err(|err| {
            map_write_error(
                err,
                ENTITY,
                TABLE,
                &[(EMAIL, &email), (EMPLOYEE_ID, &employee_id)],
                Some(("Department", department_id)),
            )
        })?;
        let department = departments::Entity::find_by_id(model.department_id)
            .one(&self.db)
            .await?;

        info!(employee.id = %id, "employee updated");
        Ok(EmployeeView::from_models(model, department))
    }

    /// Hard delete. Departments managed by this employee lose their manager
    /// in the same transaction.
    pub async fn delete(&self, id: Uuid) -> HrResult<()> {
        let txn = self.db.begin().await?;
        employees::Entity::find_by_id(id)
            .one(&txn)
            .await?
            .ok_or(HrError::NotFound { entity: ENTITY, id })?;

        let released = departments::Entity::update_many()
            .col_expr(
                departments::Column::ManagerId,
                Expr::value(Option::<Uuid>::None),
            )
            .col_expr(
                departments::Column::UpdatedAt,
                Expr::value(DateTimeWithTimeZone::from(Utc::now())),
            )
            .filter(departments::Column::ManagerId.eq(id))
            .exec(&txn)
            .await?;
        employees::Entity::delete_by_id(id).exec(&txn).await?;
        txn.commit().await?;

        info!(
            employee.id = %id,
            released_departments = released.rows_affected,
            "employee deleted"
        );
        Ok(())
    }

    /// Oldest first.
    pub async fn list(&self, filter: EmployeeFilter) -> HrResult<Vec<EmployeeView>> {
        let mut query = employees::Entity::find().find_also_related(departments::Entity);
        if let Some(needle) = filter.q.as_deref().map(str::trim).filter(|q| !q.is_empty()) {
            let backend = self.db.get_database_backend();
            query = query.filter(
                Condition::any()
                    .add(contains_ci(backend, employees::Column::FirstName, needle))
                    .add(contains_ci(backend, employees::Column::LastName, needle))
                    .add(contains_ci(backend, employees::Column::Email, needle))
                    .add(contains_ci(backend, employees::Column::EmployeeId, needle)),
            );
        }
        if let Some(department) = filter.department {
            query = query.filter(employees::Column::DepartmentId.eq(department));
        }
        if let Some(active) = filter.active {
            query = query.filter(employees::Column::IsActive.eq(active));
        }

        let rows = query
            .order_by_asc(employees::Column::CreatedAt)
            .order_by_asc(employees::Column::Id)
            .all(&self.db)
            .await?;
        Ok(rows
            .into_iter()
            .map(|(model, department)| EmployeeView::from_models(model, department))
            .collect())
    }

    async fn ensure_unique(
        &self,
        unique: UniqueField,
        value: &str,
        except: Option<Uuid>,
    ) -> HrResult<()> {
        let column = if unique.column == EMAIL.column {
            employees::Column::Email
        } else {
            employees::Column::EmployeeId
        };
        let mut query = employees::Entity::find().filter(column.eq(value));
        if let Some(id) = except {
            query = query.filter(employees::Column::Id.ne(id));
        }
        if query.count(&self.db).await? > 0 {
            debug!(field = unique.field, value, "employee uniqueness check failed");
            return Err(HrError::Duplicate {
                entity: ENTITY,
                field: unique.field,
                value: value.to_string(),
            });
        }
        Ok(())
    }
}

async fn find_department(db: &DatabaseConnection, id: Uuid) -> HrResult<departments::Model> {
    departments::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or(HrError::MissingReference {
            entity: "Department",
            id,
        })
}

/// `lower(<table>.<column>) LIKE '%needle%'`, with LIKE wildcards in the
/// needle matched literally. SQLite's `lower()` folds ASCII only, so on that
/// backend the needle is folded the same way and non-ASCII letters match
/// case-sensitively.
pub(crate) fn contains_ci<C>(backend: DbBackend, column: C, needle: &str) -> SimpleExpr
where
    C: ColumnTrait,
{
    let folded = match backend {
        DbBackend::Sqlite => needle.to_ascii_lowercase(),
        _ => needle.to_lowercase(),
    };
    let escaped = folded
        .replace('!', "!!")
        .replace('%', "!%")
        .replace('_', "!_");
    Expr::expr(Func::lower(Expr::col((column.entity_name(), column))))
        .like(LikeExpr::new(format!("%{escaped}%")).escape('!'))
}
