//! Occupancy automation endpoints.

use rocket::http::{Cookie, Status};
use rocket::local::asynchronous::Client;
use serde_json::{Value, json};

use hvac_api::orm::testing::{
    MEMBER, OTHER_WORKSPACE, OUTSIDER, OWNER, PLATFORM_ADMIN, TEST_WORKSPACE, test_rocket,
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

async fn create_environment(client: &Client, cookie: &Cookie<'static>, ws: i64, name: &str) -> i64 {
    let response = client
        .post(format!("/api/1/Workspaces/{}/Environments", ws))
        .cookie(cookie.clone())
        .json(&json!({"name": name}))
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Created);
    let env: Value = response.into_json().await.unwrap();
    env["id"].as_i64().unwrap()
}

#[rocket::async_test]
async fn test_create_automation_defaults() {
    let client = Client::untracked(test_rocket()).await.expect("valid rocket instance");
    let ws = workspace_id(&client, TEST_WORKSPACE).await;
    let owner = login(&client, OWNER).await;
    let lobby = create_environment(&client, &owner, ws, "Lobby").await;

    let response = client
        .post(format!("/api/1/Workspaces/{}/OccupancyAutomations", ws))
        .cookie(owner.clone())
        .json(&json!({
            "name": "Lobby idle",
            "inactivity_timeout_minutes": 15,
            "environment_ids": [lobby, lobby]
        }))
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Created);
    let automation: Value = response.into_json().await.unwrap();
    assert_eq!(automation["name"], "Lobby idle");
    assert_eq!(automation["inactivity_timeout_minutes"], 15);
    assert_eq!(automation["reactivate_on_presence"], true);
    assert_eq!(automation["respect_time_routines"], true);
    assert_eq!(automation["is_active"], true);
    assert_eq!(automation["environment_ids"], json!([lobby]));

    let member = login(&client, MEMBER).await;
    let response = client
        .get(format!("/api/1/Workspaces/{}/OccupancyAutomations", ws))
        .cookie(member)
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Ok);
    let listed: Value = response.into_json().await.unwrap();
    assert_eq!(listed.as_array().unwrap().len(), 1);
    assert_eq!(listed[0]["id"], automation["id"]);
}

#[rocket::async_test]
async fn test_timeout_bounds() {
    let client = Client::untracked(test_rocket()).await.expect("valid rocket instance");
    let ws = workspace_id(&client, TEST_WORKSPACE).await;
    let owner = login(&client, OWNER).await;

    for minutes in [0, -5, 1441] {
        let response = client
            .post(format!("/api/1/Workspaces/{}/OccupancyAutomations", ws))
            .cookie(owner.clone())
            .json(&json!({"name": "Idle", "inactivity_timeout_minutes": minutes}))
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::BadRequest, "timeout {}", minutes);
    }

    for minutes in [1, 1440] {
        let response = client
            .post(format!("/api/1/Workspaces/{}/OccupancyAutomations", ws))
            .cookie(owner.clone())
            .json(&json!({"name": "Idle", "inactivity_timeout_minutes": minutes}))
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::Created, "timeout {}", minutes);
    }
}

#[rocket::async_test]
async fn test_foreign_environment_is_rejected() {
    let client = Client::untracked(test_rocket()).await.expect("valid rocket instance");
    let ws = workspace_id(&client, TEST_WORKSPACE).await;
    let globex = workspace_id(&client, OTHER_WORKSPACE).await;
    let owner = login(&client, OWNER).await;
    let outsider = login(&client, OUTSIDER).await;
    let foreign = create_environment(&client, &outsider, globex, "Globex floor").await;

    let response = client
        .post(format!("/api/1/Workspaces/{}/OccupancyAutomations", ws))
        .cookie(owner)
        .json(&json!({
            "name": "Idle",
            "inactivity_timeout_minutes": 30,
            "environment_ids": [foreign]
        }))
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::BadRequest);
}

#[rocket::async_test]
async fn test_replace_and_delete_automation() {
    let client = Client::untracked(test_rocket()).await.expect("valid rocket instance");
    let ws = workspace_id(&client, TEST_WORKSPACE).await;
    let owner = login(&client, OWNER).await;
    let member = login(&client, MEMBER).await;
    let outsider = login(&client, OUTSIDER).await;
    let lobby = create_environment(&client, &owner, ws, "Lobby").await;
    let office = create_environment(&client, &owner, ws, "Office").await;

    let response = client
        .post(format!("/api/1/Workspaces/{}/OccupancyAutomations", ws))
        .cookie(owner.clone())
        .json(&json!({
            "name": "Idle",
            "inactivity_timeout_minutes": 20,
            "environment_ids": [lobby]
        }))
        .dispatch()
        .await;
    let automation: Value = response.into_json().await.unwrap();
    let uri = format!("/api/1/OccupancyAutomations/{}", automation["id"]);

    let response = client
        .put(uri.clone())
        .cookie(owner.clone())
        .json(&json!({
            "name": "Office idle",
            "inactivity_timeout_minutes": 45,
            "reactivate_on_presence": false,
            "environment_ids": [office]
        }))
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Ok);
    let replaced: Value = response.into_json().await.unwrap();
    assert_eq!(replaced["name"], "Office idle");
    assert_eq!(replaced["inactivity_timeout_minutes"], 45);
    assert_eq!(replaced["reactivate_on_presence"], false);
    assert_eq!(replaced["respect_time_routines"], true);
    assert_eq!(replaced["environment_ids"], json!([office]));

    let response = client
        .put(uri.clone())
        .cookie(member.clone())
        .json(&json!({"name": "Mine", "inactivity_timeout_minutes": 5}))
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Forbidden);

    let response = client.get(uri.clone()).cookie(outsider).dispatch().await;
    assert_eq!(response.status(), Status::NotFound);

    let response = client.delete(uri.clone()).cookie(owner.clone()).dispatch().await;
    assert_eq!(response.status(), Status::NoContent);

    let response = client.get(uri).cookie(owner).dispatch().await;
    assert_eq!(response.status(), Status::NotFound);
}
