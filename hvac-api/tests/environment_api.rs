//! Environment endpoints: CRUD, setpoint validation and control state.

use rocket::http::{Cookie, Status};
use rocket::local::asynchronous::Client;
use serde_json::{Value, json};

use hvac_api::orm::testing::{
    MEMBER, OUTSIDER, OWNER, PLATFORM_ADMIN, TEST_WORKSPACE, WORKSPACE_ADMIN, test_rocket,
};

async fn login(client: &Client, account: (&str, &str)) -> Cookie<'static> {
    let response = client
        .post("/api/1/login")
        .json(&json!({"email": account.0, "password": account.1}))
        .dispatch()
        .await;

    assert_eq!(response.status(), Status::Ok, "login as {}", account.0);
    response
        .cookies()
        .get("session")
        .expect("Session cookie should be set")
        .clone()
        .into_owned()
}

async fn workspace_id(client: &Client, name: &str) -> i64 {
    let admin = login(client, PLATFORM_ADMIN).await;
    let response = client.get("/api/1/Workspaces").cookie(admin).dispatch().await;
    let workspaces: Value = response.into_json().await.unwrap();
    workspaces
        .as_array()
        .unwrap()
        .iter()
        .find(|w| w["name"] == name)
        .and_then(|w| w["id"].as_i64())
        .expect("seeded workspace")
}

async fn create_environment(client: &Client, cookie: &Cookie<'static>, ws: i64, body: Value) -> Value {
    let response = client
        .post(format!("/api/1/Workspaces/{}/Environments", ws))
        .cookie(cookie.clone())
        .json(&body)
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Created);
    response.into_json().await.expect("valid environment JSON")
}

async fn replace_setpoints(client: &Client, cookie: &Cookie<'static>, env: i64, body: Value) -> Status {
    client
        .put(format!("/api/1/Environments/{}/Setpoints", env))
        .cookie(cookie.clone())
        .json(&body)
        .dispatch()
        .await
        .status()
}

#[rocket::async_test]
async fn test_create_environment_with_defaults() {
    let client = Client::untracked(test_rocket()).await.expect("valid rocket instance");
    let ws = workspace_id(&client, TEST_WORKSPACE).await;
    let admin = login(&client, WORKSPACE_ADMIN).await;

    let env = create_environment(&client, &admin, ws, json!({"name": "Meeting room"})).await;
    assert_eq!(env["name"], "Meeting room");
    assert_eq!(env["automatic"], false);
    assert_eq!(env["setpoints"]["cooling_enabled"], false);
    assert_eq!(env["setpoints"]["cool_trigger_temp"], 26);
    assert_eq!(env["setpoints"]["cool_target_temp"], 24);
    assert_eq!(env["setpoints"]["heat_trigger_temp"], 18);
    assert_eq!(env["setpoints"]["heat_target_temp"], 20);
    assert_eq!(env["equipment_ids"], json!([]));

    let response = client
        .get(format!("/api/1/Workspaces/{}/Environments", ws))
        .cookie(admin)
        .dispatch()
        .await;
    let listed: Value = response.into_json().await.unwrap();
    assert_eq!(listed.as_array().unwrap().len(), 1);
}

#[rocket::async_test]
async fn test_environment_access_by_role() {
    let client = Client::untracked(test_rocket()).await.expect("valid rocket instance");
    let ws = workspace_id(&client, TEST_WORKSPACE).await;
    let owner = login(&client, OWNER).await;
    let member = login(&client, MEMBER).await;
    let outsider = login(&client, OUTSIDER).await;

    let response = client
        .post(format!("/api/1/Workspaces/{}/Environments", ws))
        .cookie(member.clone())
        .json(&json!({"name": "Sneaky"}))
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Forbidden);

    let response = client
        .get(format!("/api/1/Workspaces/{}/Environments", ws))
        .cookie(outsider.clone())
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Forbidden);

    let env = create_environment(&client, &owner, ws, json!({"name": "Lobby"})).await;
    let env_id = env["id"].as_i64().unwrap();

    let response = client
        .get(format!("/api/1/Environments/{}", env_id))
        .cookie(member.clone())
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Ok);

    let response = client
        .put(format!("/api/1/Environments/{}", env_id))
        .cookie(member)
        .json(&json!({"name": "Renamed"}))
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Forbidden);

    // Existence is not leaked to non-members
    let response = client
        .get(format!("/api/1/Environments/{}", env_id))
        .cookie(outsider)
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::NotFound);
}

#[rocket::async_test]
async fn test_update_and_delete_environment() {
    let client = Client::untracked(test_rocket()).await.expect("valid rocket instance");
    let ws = workspace_id(&client, TEST_WORKSPACE).await;
    let owner = login(&client, OWNER).await;

    let response = client
        .post(format!("/api/1/Workspaces/{}/Equipments", ws))
        .cookie(owner.clone())
        .json(&json!({"name": "Split 1"}))
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Created);
    let unit: Value = response.into_json().await.unwrap();

    let env = create_environment(&client, &owner, ws, json!({"name": "Office"})).await;
    let env_id = env["id"].as_i64().unwrap();

    let response = client
        .put(format!("/api/1/Environments/{}", env_id))
        .cookie(owner.clone())
        .json(&json!({"name": "Open office", "equipment_ids": [unit["id"]]}))
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Ok);
    let updated: Value = response.into_json().await.unwrap();
    assert_eq!(updated["name"], "Open office");
    assert_eq!(updated["equipment_ids"], json!([unit["id"]]));

    let response = client
        .delete(format!("/api/1/Environments/{}", env_id))
        .cookie(owner.clone())
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::NoContent);

    let response = client
        .get(format!("/api/1/Environments/{}", env_id))
        .cookie(owner)
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::NotFound);
}

#[rocket::async_test]
async fn test_foreign_equipment_is_rejected() {
    let client = Client::untracked(test_rocket()).await.expect("valid rocket instance");
    let ws = workspace_id(&client, TEST_WORKSPACE).await;
    let owner = login(&client, OWNER).await;
    let outsider = login(&client, OUTSIDER).await;
    let globex = workspace_id(&client, "Globex Plant").await;

    let response = client
        .post(format!("/api/1/Workspaces/{}/Equipments", globex))
        .cookie(outsider)
        .json(&json!({"name": "Globex unit"}))
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Created);
    let foreign: Value = response.into_json().await.unwrap();

    let response = client
        .post(format!("/api/1/Workspaces/{}/Environments", ws))
        .cookie(owner)
        .json(&json!({"name": "Office", "equipment_ids": [foreign["id"]]}))
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::BadRequest);
}

#[rocket::async_test]
async fn test_invalid_setpoints_are_unprocessable() {
    let client = Client::untracked(test_rocket()).await.expect("valid rocket instance");
    let ws = workspace_id(&client, TEST_WORKSPACE).await;
    let owner = login(&client, OWNER).await;

    let response = client
        .post(format!("/api/1/Workspaces/{}/Environments", ws))
        .cookie(owner.clone())
        .json(&json!({
            "name": "Server room",
            "setpoints": {
                "cooling_enabled": true, "heating_enabled": false,
                "cool_trigger_temp": 22, "cool_target_temp": 22,
                "heat_trigger_temp": 18, "heat_target_temp": 20
            }
        }))
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::UnprocessableEntity);
    let body: Value = response.into_json().await.unwrap();
    assert!(body["error"].as_str().unwrap().contains("cool target"));

    let env = create_environment(&client, &owner, ws, json!({"name": "Server room"})).await;
    let env_id = env["id"].as_i64().unwrap();

    // Overlapping bands with both enabled
    let status = replace_setpoints(
        &client,
        &owner,
        env_id,
        json!({
            "automatic": true,
            "cooling_enabled": true, "heating_enabled": true,
            "cool_trigger_temp": 26, "cool_target_temp": 21,
            "heat_trigger_temp": 18, "heat_target_temp": 22
        }),
    )
    .await;
    assert_eq!(status, Status::UnprocessableEntity);

    // Upper boundary is accepted
    let status = replace_setpoints(
        &client,
        &owner,
        env_id,
        json!({
            "automatic": true,
            "cooling_enabled": true, "heating_enabled": false,
            "cool_trigger_temp": 50, "cool_target_temp": 49,
            "heat_trigger_temp": 18, "heat_target_temp": 20
        }),
    )
    .await;
    assert_eq!(status, Status::Ok);
}

#[rocket::async_test]
async fn test_adjust_rejection_leaves_state_unchanged() {
    let client = Client::untracked(test_rocket()).await.expect("valid rocket instance");
    let ws = workspace_id(&client, TEST_WORKSPACE).await;
    let owner = login(&client, OWNER).await;
    let env = create_environment(&client, &owner, ws, json!({"name": "Lab"})).await;
    let env_id = env["id"].as_i64().unwrap();

    let response = client
        .post(format!("/api/1/Environments/{}/Setpoints/adjust", env_id))
        .cookie(owner.clone())
        .json(&json!({"change": "cool_target", "value": 30}))
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::UnprocessableEntity);

    let response = client
        .get(format!("/api/1/Environments/{}", env_id))
        .cookie(owner.clone())
        .dispatch()
        .await;
    let current: Value = response.into_json().await.unwrap();
    assert_eq!(current["setpoints"], env["setpoints"]);

    let response = client
        .post(format!("/api/1/Environments/{}/Setpoints/adjust", env_id))
        .cookie(owner)
        .json(&json!({"change": "cool_target", "value": 23}))
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Ok);
    let adjusted: Value = response.into_json().await.unwrap();
    assert_eq!(adjusted["setpoints"]["cool_target_temp"], 23);
}

#[rocket::async_test]
async fn test_enabling_cooling_next_to_heating() {
    let client = Client::untracked(test_rocket()).await.expect("valid rocket instance");
    let ws = workspace_id(&client, TEST_WORKSPACE).await;
    let owner = login(&client, OWNER).await;

    for (cool_target, expected_target, expected_trigger) in [(24, 24, 26), (20, 23, 24)] {
        let env = create_environment(&client, &owner, ws, json!({"name": "Studio"})).await;
        let env_id = env["id"].as_i64().unwrap();

        let status = replace_setpoints(
            &client,
            &owner,
            env_id,
            json!({
                "automatic": true,
                "cooling_enabled": false, "heating_enabled": true,
                "cool_trigger_temp": 26, "cool_target_temp": cool_target,
                "heat_trigger_temp": 18, "heat_target_temp": 22
            }),
        )
        .await;
        assert_eq!(status, Status::Ok);

        let response = client
            .post(format!("/api/1/Environments/{}/Setpoints/adjust", env_id))
            .cookie(owner.clone())
            .json(&json!({"change": "cooling_enabled", "value": true}))
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::Ok);
        let body: Value = response.into_json().await.unwrap();
        let setpoints = &body["setpoints"];
        assert_eq!(setpoints["cooling_enabled"], true);
        assert_eq!(setpoints["cool_target_temp"], expected_target);
        assert_eq!(setpoints["cool_trigger_temp"], expected_trigger);
        assert_eq!(setpoints["heat_trigger_temp"], 18);
        assert_eq!(setpoints["heat_target_temp"], 22);
    }
}

#[rocket::async_test]
async fn test_control_state() {
    let client = Client::untracked(test_rocket()).await.expect("valid rocket instance");
    let ws = workspace_id(&client, TEST_WORKSPACE).await;
    let owner = login(&client, OWNER).await;
    let member = login(&client, MEMBER).await;

    let manual = create_environment(&client, &owner, ws, json!({"name": "Manual"})).await;
    let auto = create_environment(
        &client,
        &owner,
        ws,
        json!({
            "name": "Auto",
            "automatic": true,
            "setpoints": {
                "cooling_enabled": true, "heating_enabled": false,
                "cool_trigger_temp": 26, "cool_target_temp": 24,
                "heat_trigger_temp": 18, "heat_target_temp": 20
            }
        }),
    )
    .await;

    let response = client
        .get(format!(
            "/api/1/Environments/{}/ControlState?at=2025-06-04T12:00:00&temperature=27",
            manual["id"]
        ))
        .cookie(member.clone())
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Ok);
    let decision: Value = response.into_json().await.unwrap();
    assert_eq!(decision["reason"], "manual");
    assert_eq!(decision["demand"], "idle");

    let response = client
        .get(format!(
            "/api/1/Environments/{}/ControlState?at=2025-06-04T12:00:00&temperature=27",
            auto["id"]
        ))
        .cookie(member.clone())
        .dispatch()
        .await;
    let decision: Value = response.into_json().await.unwrap();
    assert_eq!(decision["reason"], "comfort");
    assert_eq!(decision["demand"], "cooling");
    assert_eq!(decision["within_routine_hours"], Value::Null);

    // Hysteresis: keeps cooling at 25 while already cooling
    let response = client
        .get(format!(
            "/api/1/Environments/{}/ControlState?at=2025-06-04T12:00:00&temperature=25&demand=cooling",
            auto["id"]
        ))
        .cookie(member.clone())
        .dispatch()
        .await;
    let decision: Value = response.into_json().await.unwrap();
    assert_eq!(decision["demand"], "cooling");

    let response = client
        .get(format!("/api/1/Environments/{}/ControlState?at=yesterday", auto["id"]))
        .cookie(member)
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::BadRequest);
}

#[rocket::async_test]
async fn test_control_state_respects_routines_and_occupancy() {
    let client = Client::untracked(test_rocket()).await.expect("valid rocket instance");
    let ws = workspace_id(&client, TEST_WORKSPACE).await;
    let owner = login(&client, OWNER).await;

    let env = create_environment(
        &client,
        &owner,
        ws,
        json!({
            "name": "Office",
            "automatic": true,
            "setpoints": {
                "cooling_enabled": true, "heating_enabled": false,
                "cool_trigger_temp": 26, "cool_target_temp": 24,
                "heat_trigger_temp": 18, "heat_target_temp": 20
            }
        }),
    )
    .await;
    let env_id = env["id"].as_i64().unwrap();

    let response = client
        .post(format!("/api/1/Workspaces/{}/TimeRoutines", ws))
        .cookie(owner.clone())
        .json(&json!({
            "name": "Weekdays",
            "schedules": [
                {"day_of_week": "wednesday", "slots": [{"start_time": "08:00:00", "end_time": "18:00:00"}]}
            ],
            "environment_ids": [env_id]
        }))
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Created);

    let response = client
        .post(format!("/api/1/Workspaces/{}/OccupancyAutomations", ws))
        .cookie(owner.clone())
        .json(&json!({
            "name": "Idle office",
            "inactivity_timeout_minutes": 15,
            "environment_ids": [env_id]
        }))
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Created);

    // 2025-06-04 is a Wednesday; 20:00 is after hours
    let response = client
        .get(format!(
            "/api/1/Environments/{}/ControlState?at=2025-06-04T20:00:00&temperature=30",
            env_id
        ))
        .cookie(owner.clone())
        .dispatch()
        .await;
    let decision: Value = response.into_json().await.unwrap();
    assert_eq!(decision["within_routine_hours"], false);
    assert_eq!(decision["reason"], "outside_routine_hours");
    assert_eq!(decision["demand"], "idle");

    // Within hours but nobody seen for 30 minutes
    let response = client
        .get(format!(
            "/api/1/Environments/{}/ControlState?at=2025-06-04T12:00:00&temperature=30&last_presence=2025-06-04T11:30:00",
            env_id
        ))
        .cookie(owner.clone())
        .dispatch()
        .await;
    let decision: Value = response.into_json().await.unwrap();
    assert_eq!(decision["within_routine_hours"], true);
    assert_eq!(decision["vacant"], true);
    assert_eq!(decision["reason"], "vacant");

    // Seen five minutes ago
    let response = client
        .get(format!(
            "/api/1/Environments/{}/ControlState?at=2025-06-04T12:00:00&temperature=30&last_presence=2025-06-04T11:55:00",
            env_id
        ))
        .cookie(owner)
        .dispatch()
        .await;
    let decision: Value = response.into_json().await.unwrap();
    assert_eq!(decision["vacant"], false);
    assert_eq!(decision["demand"], "cooling");
}
