//! Employee and department directory.
//!
//! Two stores share one database handle. An employee belongs to exactly one
//! department; a department optionally names an employee as its manager.
//! Both links are stored as ids and resolved into summaries on read.
//!
//! Deleting a department that still has employees is refused. Deleting an
//! employee clears any department that named them as manager.

pub mod department;
pub mod employee;
mod error;
pub mod lenient;
pub mod seed;
mod validate;

pub use department::{
    DepartmentFilter, DepartmentPatch, DepartmentStore, DepartmentView, ManagerSummary,
    NewDepartment,
};
pub use employee::{
    DepartmentSummary, EmployeeFilter, EmployeePatch, EmployeeStore, EmployeeView, NewEmployee,
};
pub use error::{HrError, HrResult};
pub use seed::{SeedSummary, seed_demo};
