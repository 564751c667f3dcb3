//! Demo directory for local development.

use chrono::NaiveDate;
use entity::departments;
use sea_orm::{DatabaseConnection, EntityTrait, PaginatorTrait};
use tracing::info;

use crate::{
    HrResult,
    department::{DepartmentPatch, DepartmentStore, NewDepartment},
    employee::{EmployeeStore, NewEmployee},
};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SeedSummary {
    pub departments: usize,
    pub employees: usize,
    /// The directory already held data and nothing was written.
    pub skipped: bool,
}

struct DemoDepartment {
    code: &'static str,
    name: &'static str,
    description: &'static str,
    location: &'static str,
}

struct DemoEmployee {
    employee_id: &'static str,
    first_name: &'static str,
    last_name: &'static str,
    position: &'static str,
    department: &'static str,
    hired: (i32, u32, u32),
    salary: f64,
    manages: bool,
}

const DEPARTMENTS: &[DemoDepartment] = &[
    DemoDepartment {
        code: "CLIN01",
        name: "Clinical Dentistry",
        description: "General and restorative dental care",
        location: "Building A, Floor 1",
    },
    DemoDepartment {
        code: "HYG01",
        name: "Hygiene",
        description: "Cleanings, periodontal maintenance and patient education",
        location: "Building A, Floor 2",
    },
    DemoDepartment {
        code: "ADM01",
        name: "Front Office",
        description: "Reception, scheduling and billing",
        location: "Building B, Ground Floor",
    },
];

const EMPLOYEES: &[DemoEmployee] = &[
    DemoEmployee {
        employee_id: "EMP001",
        first_name: "Helena",
        last_name: "Marsh",
        position: "Lead Dentist",
        department: "CLIN01",
        hired: (2018, 3, 12),
        salary: 185_000.0,
        manages: true,
    },
    DemoEmployee {
        employee_id: "EMP002",
        first_name: "Tomas",
        last_name: "Ibarra",
        position: "Associate Dentist",
        department: "CLIN01",
        hired: (2021, 9, 1),
        salary: 142_000.0,
        manages: false,
    },
    DemoEmployee {
        employee_id: "EMP003",
        first_name: "Priya",
        last_name: "Nair",
        position: "Senior Hygienist",
        department: "HYG01",
        hired: (2019, 6, 17),
        salary: 88_000.0,
        manages: true,
    },
    DemoEmployee {
        employee_id: "EMP004",
        first_name: "Owen",
        last_name: "Fletcher",
        position: "Dental Hygienist",
        department: "HYG01",
        hired: (2023, 1, 9),
        salary: 71_500.0,
        manages: false,
    },
    DemoEmployee {
        employee_id: "EMP005",
        first_name: "Grace",
        last_name: "Okafor",
        position: "Office Manager",
        department: "ADM01",
        hired: (2017, 11, 20),
        salary: 64_000.0,
        manages: true,
    },
    DemoEmployee {
        employee_id: "EMP006",
        first_name: "Luis",
        last_name: "Moreno",
        position: "Receptionist",
        department: "ADM01",
        hired: (2024, 4, 2),
        salary: 41_000.0,
        manages: false,
    },
];

/// Inserts the demo directory unless a department already exists.
pub async fn seed_demo(db: &DatabaseConnection) -> HrResult<SeedSummary> {
    if departments::Entity::find().count(db).await? > 0 {
        info!("directory already populated; skipping demo seed");
        return Ok(SeedSummary {
            skipped: true,
            ..SeedSummary::default()
        });
    }

    let department_store = DepartmentStore::new(db.clone());
    let employee_store = EmployeeStore::new(db.clone());
    let mut summary = SeedSummary::default();

    let mut created = Vec::with_capacity(DEPARTMENTS.len());
    for demo in DEPARTMENTS {
        let department = department_store
            .create(NewDepartment {
                name: Some(demo.name.into()),
                description: Some(demo.description.into()),
                location: Some(demo.location.into()),
                department_code: Some(demo.code.into()),
                ..NewDepartment::default()
            })
            .await?;
        created.push((demo.code, department.id));
        summary.departments += 1;
    }

    for demo in EMPLOYEES {
        let department = created
            .iter()
            .find(|(code, _)| *code == demo.department)
            .map(|(_, id)| *id);
        let (year, month, day) = demo.hired;
        let hire_date = NaiveDate::from_ymd_opt(year, month, day)
            .and_then(|date| date.and_hms_opt(0, 0, 0))
            .map(|at| at.and_utc());
        let employee = employee_store
            .create(NewEmployee {
                first_name: Some(demo.first_name.into()),
                last_name: Some(demo.last_name.into()),
                email: Some(format!(
                    "{}.{}@apollonia.dental",
                    demo.first_name.to_lowercase(),
                    demo.last_name.to_lowercase()
                )),
                phone: Some(format!("555-01{}", &demo.employee_id[4..])),
                position: Some(demo.position.into()),
                department,
                hire_date,
                salary: Some(demo.salary),
                is_active: Some(true),
                employee_id: Some(demo.employee_id.into()),
            })
            .await?;
        summary.employees += 1;

        if let (true, Some(department)) = (demo.manages, department) {
            department_store
                .update(
                    department,
                    DepartmentPatch {
                        manager: Some(Some(employee.id)),
                        ..DepartmentPatch::default()
                    },
                )
                .await?;
        }
    }

    info!(
        departments = summary.departments,
        employees = summary.employees,
        "demo directory seeded"
    );
    Ok(summary)
}
