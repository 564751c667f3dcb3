#![allow(dead_code)]

use migration::{Migrator, MigratorTrait};
use products_hr::{DepartmentStore, DepartmentView, EmployeeStore, NewDepartment, NewEmployee};
use sea_orm::{Database, DatabaseConnection};
use uuid::Uuid;

pub struct Directory {
    pub db: DatabaseConnection,
    pub employees: EmployeeStore,
    pub departments: DepartmentStore,
}

pub async fn directory() -> Directory {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    Migrator::up(&db, None).await.unwrap();
    Directory {
        employees: EmployeeStore::new(db.clone()),
        departments: DepartmentStore::new(db.clone()),
        db,
    }
}

pub fn radiology() -> NewDepartment {
    NewDepartment {
        name: Some("Radiology".into()),
        description: Some("Imaging".into()),
        location: Some("Bldg A".into()),
        department_code: Some("RAD01".into()),
        ..NewDepartment::default()
    }
}

pub fn department(name: &str, code: &str) -> NewDepartment {
    NewDepartment {
        name: Some(name.into()),
        description: Some(format!("{name} team")),
        location: Some("Bldg B".into()),
        department_code: Some(code.into()),
        ..NewDepartment::default()
    }
}

pub fn ana(department: Uuid) -> NewEmployee {
    NewEmployee {
        first_name: Some("Ana".into()),
        last_name: Some("Ruiz".into()),
        email: Some("ANA@X.COM".into()),
        phone: Some("555-0100".into()),
        position: Some("Tech".into()),
        department: Some(department),
        salary: Some(50_000.0),
        employee_id: Some("E100".into()),
        ..NewEmployee::default()
    }
}

pub fn employee(department: Uuid, first: &str, last: &str, employee_id: &str) -> NewEmployee {
    NewEmployee {
        first_name: Some(first.into()),
        last_name: Some(last.into()),
        email: Some(format!("{}@x.com", first.to_lowercase())),
        phone: Some("555-0199".into()),
        position: Some("Assistant".into()),
        department: Some(department),
        salary: Some(40_000.0),
        employee_id: Some(employee_id.into()),
        ..NewEmployee::default()
    }
}

pub async fn seeded_radiology(directory: &Directory) -> DepartmentView {
    directory.departments.create(radiology()).await.unwrap()
}
