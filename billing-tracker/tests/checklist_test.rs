mod common;

use common::TestApp;
use serde_json::{json, Value};

async fn add_task(app: &TestApp, area: &str, date: &str, name: &str) -> Value {
    let response = app
        .client
        .post(app.url("/api/checklist/add"))
        .json(&json!({ "area": area, "date": date, "taskName": name, "description": "" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);
    response.json().await.unwrap()
}

#[tokio::test]
async fn tasks_are_listed_by_day_and_area() {
    let app = TestApp::spawn().await;
    add_task(&app, "backups", "2024-03-05", "Verify snapshot").await;
    add_task(&app, " network ", "2024-03-05", "Check firewall").await;
    add_task(&app, "backups", "2024-03-06", "Rotate keys").await;

    let (status, day) = app
        .get_json("/api/checklist", &[("date", "2024-03-05")])
        .await;
    assert_eq!(status, 200);
    assert_eq!(day.as_array().unwrap().len(), 2);

    let (_, backups) = app.get_json("/api/checklist", &[("area", "backups")]).await;
    let backups = backups.as_array().unwrap();
    assert_eq!(backups.len(), 2);
    assert_eq!(backups[0]["taskName"], "Rotate keys");

    let (_, ranged) = app
        .get_json(
            "/api/checklist",
            &[("startDate", "2024-03-06"), ("endDate", "2024-03-06")],
        )
        .await;
    assert_eq!(ranged.as_array().unwrap().len(), 1);

    let (_, areas) = app.get_json("/api/checklist/areas", &[]).await;
    assert_eq!(areas, json!(["backups", "network"]));
}

#[tokio::test]
async fn completion_stamps_and_clears() {
    let app = TestApp::spawn().await;
    let task = add_task(&app, "backups", "2024-03-05", "Verify snapshot").await;
    assert_eq!(task["isCompleted"], false);
    let id = task["id"].as_str().unwrap();

    let done: Value = app
        .client
        .patch(app.url(&format!("/api/checklist/{}", id)))
        .json(&json!({ "isCompleted": true, "checkedBy": "dana" }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(done["isCompleted"], true);
    assert_eq!(done["checkedBy"], "dana");
    assert!(done["checkedAt"].is_string());

    let anonymous: Value = app
        .client
        .patch(app.url(&format!("/api/checklist/{}", id)))
        .json(&json!({ "isCompleted": true }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(anonymous["checkedBy"], "Unknown");

    let undone: Value = app
        .client
        .patch(app.url(&format!("/api/checklist/{}", id)))
        .json(&json!({ "isCompleted": false, "checkedBy": "dana" }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(undone["isCompleted"], false);
    assert!(undone["checkedBy"].is_null());
    assert!(undone["checkedAt"].is_null());
}

#[tokio::test]
async fn unknown_task_ids_are_404() {
    let app = TestApp::spawn().await;

    let response = app
        .client
        .patch(app.url("/api/checklist/missing"))
        .json(&json!({ "isCompleted": true }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 404);

    let response = app
        .client
        .delete(app.url("/api/checklist/missing"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 404);
}

#[tokio::test]
async fn deleted_tasks_disappear() {
    let app = TestApp::spawn().await;
    let task = add_task(&app, "backups", "2024-03-05", "Verify snapshot").await;
    let id = task["id"].as_str().unwrap();

    let response = app
        .client
        .delete(app.url(&format!("/api/checklist/{}", id)))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["message"], "Task deleted successfully");

    let (_, all) = app.get_json("/api/checklist", &[]).await;
    assert_eq!(all, json!([]));
}

#[tokio::test]
async fn incomplete_tasks_are_rejected() {
    let app = TestApp::spawn().await;

    for body in [
        json!({ "date": "2024-03-05", "taskName": "x" }),
        json!({ "area": "backups", "taskName": "x" }),
        json!({ "area": "backups", "date": "March 5", "taskName": "x" }),
        json!({ "area": "backups", "date": "2024-03-05", "taskName": "  " }),
    ] {
        let response = app
            .client
            .post(app.url("/api/checklist/add"))
            .json(&body)
            .send()
            .await
            .unwrap();
        assert_eq!(response.status().as_u16(), 400, "accepted {}", body);
    }
}

#[tokio::test]
async fn checklist_export_is_scoped_by_area() {
    let app = TestApp::spawn().await;
    add_task(&app, "backups", "2024-03-05", "Verify snapshot").await;
    add_task(&app, "network", "2024-03-05", "Check firewall").await;

    let response = app
        .client
        .get(app.url("/api/checklist/export-csv"))
        .query(&[("area", "backups")])
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);
    let disposition = response.headers()["content-disposition"]
        .to_str()
        .unwrap()
        .to_string();
    assert!(disposition.starts_with("attachment; filename=\"checklist-backups-"));

    let csv = response.text().await.unwrap();
    let lines: Vec<&str> = csv.lines().collect();
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[1], "3/5/2024,backups,Verify snapshot,,No,,");
}
