//! Table definitions for the directory.
//!
//! Cross-table links are plain UUID columns. `employees.department_id` is
//! required; `departments.manager_id` is optional and carries no database
//! foreign key.

pub mod departments;
pub mod employees;

pub mod prelude {
    pub use super::departments::Entity as Departments;
    pub use super::employees::Entity as Employees;
}
