mod common;

use std::time::Duration;

use common::{ana, directory, employee, seeded_radiology};
use products_hr::{EmployeeFilter, EmployeePatch, HrError, NewEmployee};
use serde_json::json;
use uuid::Uuid;

#[tokio::test]
async fn create_trims_text_and_lowercases_email() {
    let dir = directory().await;
    let radiology = seeded_radiology(&dir).await;

    let mut input = ana(radiology.id);
    input.first_name = Some("  Ana ".into());
    input.last_name = Some(" Ruiz".into());
    input.email = Some("  ANA@X.COM  ".into());
    input.position = Some("Tech  ".into());
    input.employee_id = Some(" E100 ".into());
    let created = dir.employees.create(input).await.unwrap();

    let fetched = dir.employees.get(created.id).await.unwrap();
    assert_eq!(fetched.first_name, "Ana");
    assert_eq!(fetched.last_name, "Ruiz");
    assert_eq!(fetched.email, "ana@x.com");
    assert_eq!(fetched.position, "Tech");
    assert_eq!(fetched.employee_id, "E100");
    assert!(fetched.is_active);
    assert_eq!(fetched.salary, 50_000.0);
}

#[tokio::test]
async fn end_to_end_resolves_department_on_read() {
    let dir = directory().await;
    let radiology = seeded_radiology(&dir).await;
    let created = dir.employees.create(ana(radiology.id)).await.unwrap();

    let fetched = dir.employees.get(created.id).await.unwrap();
    assert_eq!(fetched.email, "ana@x.com");
    let department = fetched.department.expect("department resolved");
    assert_eq!(department.name, "Radiology");
    assert_eq!(department.department_code, "RAD01");
    assert_eq!(department.id, radiology.id);
}

#[tokio::test]
async fn duplicate_email_is_rejected_in_any_case() {
    let dir = directory().await;
    let radiology = seeded_radiology(&dir).await;
    dir.employees.create(ana(radiology.id)).await.unwrap();

    let mut again = ana(radiology.id);
    again.email = Some("Ana@x.com".into());
    again.employee_id = Some("E200".into());
    let err = dir.employees.create(again).await.unwrap_err();
    assert!(
        matches!(err, HrError::Duplicate { field: "email", .. }),
        "unexpected error: {err:?}"
    );
}

#[tokio::test]
async fn duplicate_employee_id_is_rejected() {
    let dir = directory().await;
    let radiology = seeded_radiology(&dir).await;
    dir.employees.create(ana(radiology.id)).await.unwrap();

    let err = dir
        .employees
        .create(employee(radiology.id, "Ben", "Ortiz", "E100"))
        .await
        .unwrap_err();
    assert!(
        matches!(err, HrError::Duplicate { field: "employeeId", .. }),
        "unexpected error: {err:?}"
    );
    assert_eq!(err.to_string(), "Employee with employeeId `E100` already exists");
}

#[tokio::test]
async fn missing_fields_are_reported_together() {
    let dir = directory().await;
    let err = dir
        .employees
        .create(NewEmployee {
            first_name: Some("   ".into()),
            email: Some("ana@x.com".into()),
            ..NewEmployee::default()
        })
        .await
        .unwrap_err();

    let HrError::Validation { message } = err else {
        panic!("expected validation error, got {err:?}");
    };
    assert!(message.contains("firstName is required"), "{message}");
    assert!(message.contains("department is required"), "{message}");
    assert!(message.contains("salary is required"), "{message}");
    assert!(message.contains("employeeId is required"), "{message}");
    assert!(!message.contains("email"), "{message}");
}

#[tokio::test]
async fn malformed_email_and_salary_are_rejected() {
    let dir = directory().await;
    let radiology = seeded_radiology(&dir).await;

    let mut input = ana(radiology.id);
    input.email = Some("not-an-address".into());
    input.salary = Some(f64::NAN);
    let err = dir.employees.create(input).await.unwrap_err();
    let HrError::Validation { message } = err else {
        panic!("expected validation error, got {err:?}");
    };
    assert!(message.contains("email must be a valid email address"), "{message}");
    assert!(message.contains("salary must be a finite number"), "{message}");
}

#[tokio::test]
async fn unknown_department_is_a_missing_reference() {
    let dir = directory().await;
    let ghost = Uuid::new_v4();
    let err = dir.employees.create(ana(ghost)).await.unwrap_err();
    assert!(
        matches!(err, HrError::MissingReference { entity: "Department", id } if id == ghost),
        "unexpected error: {err:?}"
    );
}

#[tokio::test]
async fn form_strings_are_accepted() {
    let dir = directory().await;
    let radiology = seeded_radiology(&dir).await;

    let input: NewEmployee = serde_json::from_value(json!({
        "firstName": "Ana",
        "lastName": "Ruiz",
        "email": "ana@x.com",
        "phone": "555-0100",
        "position": "Tech",
        "department": radiology.id.to_string(),
        "hireDate": "2024-05-01",
        "salary": "52000.50",
        "isActive": "off",
        "employeeId": "E100"
    }))
    .unwrap();
    let created = dir.employees.create(input).await.unwrap();

    assert_eq!(created.salary, 52_000.5);
    assert!(!created.is_active);
    assert_eq!(created.hire_date.to_rfc3339(), "2024-05-01T00:00:00+00:00");
}

#[tokio::test]
async fn salary_update_changes_only_salary() {
    let dir = directory().await;
    let radiology = seeded_radiology(&dir).await;
    let created = dir.employees.create(ana(radiology.id)).await.unwrap();
    let before = dir.employees.get(created.id).await.unwrap();

    tokio::time::sleep(Duration::from_millis(20)).await;
    let updated = dir
        .employees
        .update(
            created.id,
            EmployeePatch {
                salary: Some(5_000.0),
                ..EmployeePatch::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(updated.salary, 5_000.0);
    assert!(updated.updated_at > before.updated_at);
    let expected = products_hr::EmployeeView {
        salary: 5_000.0,
        updated_at: updated.updated_at,
        ..before
    };
    assert_eq!(updated, expected);
    assert_eq!(dir.employees.get(created.id).await.unwrap(), expected);
}

#[tokio::test]
async fn update_rejects_clearing_department_and_taken_values() {
    let dir = directory().await;
    let radiology = seeded_radiology(&dir).await;
    let first = dir.employees.create(ana(radiology.id)).await.unwrap();
    let second = dir
        .employees
        .create(employee(radiology.id, "Ben", "Ortiz", "E200"))
        .await
        .unwrap();

    let clear: EmployeePatch = serde_json::from_value(json!({ "department": "" })).unwrap();
    let err = dir.employees.update(first.id, clear).await.unwrap_err();
    assert!(
        matches!(&err, HrError::Validation { message } if message == "department is required"),
        "unexpected error: {err:?}"
    );

    let err = dir
        .employees
        .update(
            second.id,
            EmployeePatch {
                email: Some("ANA@x.com".into()),
                ..EmployeePatch::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, HrError::Duplicate { field: "email", .. }));

    // Re-submitting a record's own values is not a conflict.
    dir.employees
        .update(
            first.id,
            EmployeePatch {
                email: Some("ana@x.com".into()),
                employee_id: Some("E100".into()),
                ..EmployeePatch::default()
            },
        )
        .await
        .unwrap();
}

#[tokio::test]
async fn update_can_move_to_another_department() {
    let dir = directory().await;
    let radiology = seeded_radiology(&dir).await;
    let surgery = dir
        .departments
        .create(common::department("Surgery", "SUR01"))
        .await
        .unwrap();
    let created = dir.employees.create(ana(radiology.id)).await.unwrap();

    let moved = dir
        .employees
        .update(
            created.id,
            EmployeePatch {
                department: Some(Some(surgery.id)),
                ..EmployeePatch::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(moved.department.map(|d| d.name).as_deref(), Some("Surgery"));

    let err = dir
        .employees
        .update(
            created.id,
            EmployeePatch {
                department: Some(Some(Uuid::new_v4())),
                ..EmployeePatch::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, HrError::MissingReference { .. }));
}

#[tokio::test]
async fn delete_then_get_is_not_found() {
    let dir = directory().await;
    let radiology = seeded_radiology(&dir).await;
    let created = dir.employees.create(ana(radiology.id)).await.unwrap();

    dir.employees.delete(created.id).await.unwrap();

    let err = dir.employees.get(created.id).await.unwrap_err();
    assert!(matches!(err, HrError::NotFound { entity: "Employee", .. }));
    let err = dir.employees.delete(created.id).await.unwrap_err();
    assert!(matches!(err, HrError::NotFound { .. }));
    let err = dir
        .employees
        .update(created.id, EmployeePatch::default())
        .await
        .unwrap_err();
    assert!(matches!(err, HrError::NotFound { .. }));
}

#[tokio::test]
async fn list_resolves_departments_and_filters() {
    let dir = directory().await;
    let radiology = seeded_radiology(&dir).await;
    let surgery = dir
        .departments
        .create(common::department("Surgery", "SUR01"))
        .await
        .unwrap();
    dir.employees.create(ana(radiology.id)).await.unwrap();
    tokio::time::sleep(Duration::from_millis(5)).await;
    let mut ben = employee(surgery.id, "Ben", "Ortiz", "E200");
    ben.is_active = Some(false);
    dir.employees.create(ben).await.unwrap();

    let all = dir.employees.list(EmployeeFilter::default()).await.unwrap();
    let names: Vec<_> = all.iter().map(|e| e.first_name.as_str()).collect();
    assert_eq!(names, ["Ana", "Ben"]);
    let departments: Vec<_> = all
        .iter()
        .map(|e| e.department.as_ref().map(|d| d.name.as_str()))
        .collect();
    assert_eq!(departments, [Some("Radiology"), Some("Surgery")]);

    let by_text = dir
        .employees
        .list(EmployeeFilter {
            q: Some("RUIZ".into()),
            ..EmployeeFilter::default()
        })
        .await
        .unwrap();
    assert_eq!(by_text.len(), 1);
    assert_eq!(by_text[0].employee_id, "E100");

    let by_department = dir
        .employees
        .list(EmployeeFilter {
            department: Some(surgery.id),
            ..EmployeeFilter::default()
        })
        .await
        .unwrap();
    assert_eq!(by_department.len(), 1);
    assert_eq!(by_department[0].first_name, "Ben");

    let inactive = dir
        .employees
        .list(EmployeeFilter {
            active: Some(false),
            ..EmployeeFilter::default()
        })
        .await
        .unwrap();
    assert_eq!(inactive.len(), 1);
    assert_eq!(inactive[0].first_name, "Ben");

    // Wildcards in the needle match literally.
    let wildcard = dir
        .employees
        .list(EmployeeFilter {
            q: Some("%".into()),
            ..EmployeeFilter::default()
        })
        .await
        .unwrap();
    assert!(wildcard.is_empty());
}

#[tokio::test]
async fn unknown_ids_are_not_found() {
    let dir = directory().await;
    let radiology = seeded_radiology(&dir).await;
    let ghost = Uuid::new_v4();

    let err = dir
        .employees
        .update(
            ghost,
            EmployeePatch {
                salary: Some(5_000.0),
                department: Some(Some(radiology.id)),
                ..EmployeePatch::default()
            },
        )
        .await
        .unwrap_err();
    assert!(
        matches!(err, HrError::NotFound { entity: "Employee", id } if id == ghost),
        "unexpected error: {err:?}"
    );

    let err = dir.employees.delete(ghost).await.unwrap_err();
    assert!(
        matches!(err, HrError::NotFound { entity: "Employee", id } if id == ghost),
        "unexpected error: {err:?}"
    );
    assert_eq!(err.to_string(), "Employee not found");
}

#[tokio::test]
async fn search_matches_accented_names_regardless_of_ascii_case() {
    let dir = directory().await;
    let radiology = seeded_radiology(&dir).await;
    let mut input = ana(radiology.id);
    input.first_name = Some("Ána".into());
    dir.employees.create(input).await.unwrap();

    let found = dir
        .employees
        .list(EmployeeFilter {
            q: Some("ÁNA".into()),
            ..EmployeeFilter::default()
        })
        .await
        .unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].first_name, "Ána");
}
