#[cfg(test)]
#[allow(dead_code)]
mod test_helpers;

use crate::test_helpers::common::{connect, create_test_runtime, entity_path, query, query_path};
use crate::test_helpers::fixtures::{CUSTOMER_ACME, EMPTY_QUERY, JOB_1290, UNSYNCED_PROJECT};
use mockito::{Matcher, Server};

const FIND_ACME: &str =
    "SELECT * FROM Customer WHERE DisplayName = 'Acme Builders' AND Active IN (true, false)";
const FIND_JOB_1290: &str =
    "SELECT * FROM Customer WHERE Job = true AND DisplayName LIKE '1290%' AND Active IN (true, false)";

#[tokio::test]
async fn sync_links_project_to_the_job_of_its_customer() {
    let mut server = Server::new_async().await;
    let customer = server
        .mock("GET", query_path().as_str())
        .match_query(query(FIND_ACME))
        .with_body(CUSTOMER_ACME)
        .create_async()
        .await;
    let job = server
        .mock("GET", query_path().as_str())
        .match_query(query(FIND_JOB_1290))
        .with_body(JOB_1290)
        .create_async()
        .await;

    let runtime = create_test_runtime(&server.url()).unwrap();
    runtime.exec_sql(UNSYNCED_PROJECT).await.unwrap();
    connect(&runtime).await;

    let result = runtime.engagement_sync().sync_engagement("e1", false).await;
    customer.assert_async().await;
    job.assert_async().await;
    assert!(result.success, "{:?}", result.error);
    assert_eq!(result.customer_id.as_deref(), Some("58"));
    assert_eq!(result.job_id.as_deref(), Some("88"));

    let report = runtime.engagement_sync().status_report().await.unwrap();
    assert_eq!((report.total, report.synced, report.unsynced), (1, 1, 0));
    assert_eq!(report.recently_synced[0].qbo_job_id.as_deref(), Some("88"));
}

#[tokio::test]
async fn missing_job_is_created_on_request() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", query_path().as_str())
        .match_query(query(FIND_ACME))
        .with_body(CUSTOMER_ACME)
        .create_async()
        .await;
    server
        .mock("GET", query_path().as_str())
        .match_query(query(FIND_JOB_1290))
        .with_body(EMPTY_QUERY)
        .create_async()
        .await;
    let create_job = server
        .mock("POST", entity_path("customer").as_str())
        .match_body(Matcher::PartialJsonString(
            r#"{"DisplayName":"1290 Lakeside Remodel","Job":true,"BillWithParent":true,"ParentRef":{"value":"58"}}"#.into(),
        ))
        .with_body(r#"{"Customer":{"Id":"90","DisplayName":"1290 Lakeside Remodel","Job":true}}"#)
        .create_async()
        .await;

    let runtime = create_test_runtime(&server.url()).unwrap();
    runtime.exec_sql(UNSYNCED_PROJECT).await.unwrap();
    connect(&runtime).await;

    let refused = runtime.engagement_sync().sync_engagement("e1", false).await;
    assert!(!refused.success);
    assert!(refused
        .error
        .unwrap()
        .starts_with("QuickBooks project not found for 1290."));

    let created = runtime.engagement_sync().sync_engagement("e1", true).await;
    create_job.assert_async().await;
    assert!(created.success, "{:?}", created.error);
    assert_eq!(created.job_id.as_deref(), Some("90"));
}

#[tokio::test]
async fn sync_multiple_counts_each_engagement() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", query_path().as_str())
        .match_query(query(FIND_ACME))
        .with_body(CUSTOMER_ACME)
        .create_async()
        .await;
    server
        .mock("GET", query_path().as_str())
        .match_query(query(FIND_JOB_1290))
        .with_body(JOB_1290)
        .create_async()
        .await;

    let runtime = create_test_runtime(&server.url()).unwrap();
    runtime.exec_sql(UNSYNCED_PROJECT).await.unwrap();
    connect(&runtime).await;

    let outcome = runtime
        .engagement_sync()
        .sync_multiple(&["e1".to_string(), "missing".to_string()])
        .await;
    assert_eq!((outcome.success, outcome.failed), (1, 1));
    assert_eq!(outcome.results[1].error.as_deref(), Some("Engagement not found"));
}

#[tokio::test]
async fn sync_without_tokens_reports_not_connected() {
    let server = Server::new_async().await;
    let runtime = create_test_runtime(&server.url()).unwrap();
    runtime.exec_sql(UNSYNCED_PROJECT).await.unwrap();

    let batch = runtime.engagement_sync().sync_all_projects(true).await.unwrap();
    assert_eq!((batch.synced_count, batch.error_count, batch.total_count), (0, 1, 1));
    assert_eq!(batch.results[0].project_number.as_deref(), Some("1290"));
    assert_eq!(
        batch.results[0].result.error.as_deref(),
        Some("Not connected to QuickBooks. Please authorize first.")
    );
}

const LINK_ACME: &str = "UPDATE companies SET qbo_id = '58' WHERE id = 'c1';";

/// Serves the customer renamed in QuickBooks and the job of project 1290
async fn renamed_customer(server: &mut mockito::ServerGuard) -> (mockito::Mock, mockito::Mock) {
    let fetch = server
        .mock("GET", entity_path("customer/58").as_str())
        .with_body(r#"{"Customer":{"Id":"58","SyncToken":"3","DisplayName":"Acme Bldrs","CompanyName":"Acme Bldrs"}}"#)
        .create_async()
        .await;
    let job = server
        .mock("GET", query_path().as_str())
        .match_query(query(FIND_JOB_1290))
        .with_body(JOB_1290)
        .create_async()
        .await;
    (fetch, job)
}

#[tokio::test]
async fn renamed_company_renames_its_customer() {
    let mut server = Server::new_async().await;
    let (_fetch, job) = renamed_customer(&mut server).await;
    let rename = server
        .mock("POST", entity_path("customer").as_str())
        .match_body(Matcher::PartialJsonString(
            r#"{"Id":"58","SyncToken":"3","DisplayName":"Acme Builders","CompanyName":"Acme Builders"}"#.into(),
        ))
        .with_body(r#"{"Customer":{"Id":"58","SyncToken":"4","DisplayName":"Acme Builders"}}"#)
        .expect(1)
        .create_async()
        .await;
    let by_name = server
        .mock("GET", query_path().as_str())
        .match_query(query(FIND_ACME))
        .with_body(CUSTOMER_ACME)
        .expect(0)
        .create_async()
        .await;

    let runtime = create_test_runtime(&server.url()).unwrap();
    runtime.exec_sql(UNSYNCED_PROJECT).await.unwrap();
    runtime.exec_sql(LINK_ACME).await.unwrap();
    connect(&runtime).await;

    let result = runtime.engagement_sync().sync_engagement("e1", false).await;
    rename.assert_async().await;
    by_name.assert_async().await;
    job.assert_async().await;
    assert!(result.success, "{:?}", result.error);
    assert_eq!(result.customer_id.as_deref(), Some("58"));
    assert_eq!(result.job_id.as_deref(), Some("88"));
}

#[tokio::test]
async fn failed_rename_falls_back_to_the_name_lookup() {
    let mut server = Server::new_async().await;
    let (_fetch, _job) = renamed_customer(&mut server).await;
    let rename = server
        .mock("POST", entity_path("customer").as_str())
        .with_status(500)
        .with_body(r#"{"Fault":{"Error":[{"Message":"Stale object"}]}}"#)
        .expect(1)
        .create_async()
        .await;
    let by_name = server
        .mock("GET", query_path().as_str())
        .match_query(query(FIND_ACME))
        .with_body(CUSTOMER_ACME)
        .expect(1)
        .create_async()
        .await;

    let runtime = create_test_runtime(&server.url()).unwrap();
    runtime.exec_sql(UNSYNCED_PROJECT).await.unwrap();
    runtime.exec_sql(LINK_ACME).await.unwrap();
    connect(&runtime).await;

    let result = runtime.engagement_sync().sync_engagement("e1", false).await;
    rename.assert_async().await;
    by_name.assert_async().await;
    assert!(result.success, "{:?}", result.error);
    assert_eq!(result.customer_id.as_deref(), Some("58"));
    assert_eq!(result.job_id.as_deref(), Some("88"));
}

#[tokio::test]
async fn unreadable_customer_falls_back_to_the_name_lookup() {
    let mut server = Server::new_async().await;
    let fetch = server
        .mock("GET", entity_path("customer/58").as_str())
        .with_status(400)
        .with_body(r#"{"Fault":{"Error":[{"Message":"Object Not Found"}]}}"#)
        .expect(1)
        .create_async()
        .await;
    let by_name = server
        .mock("GET", query_path().as_str())
        .match_query(query(FIND_ACME))
        .with_body(CUSTOMER_ACME)
        .expect(1)
        .create_async()
        .await;
    server
        .mock("GET", query_path().as_str())
        .match_query(query(FIND_JOB_1290))
        .with_body(JOB_1290)
        .create_async()
        .await;

    let runtime = create_test_runtime(&server.url()).unwrap();
    runtime.exec_sql(UNSYNCED_PROJECT).await.unwrap();
    runtime.exec_sql(LINK_ACME).await.unwrap();
    connect(&runtime).await;

    let result = runtime.engagement_sync().sync_engagement("e1", false).await;
    fetch.assert_async().await;
    by_name.assert_async().await;
    assert!(result.success, "{:?}", result.error);
    assert_eq!(result.job_id.as_deref(), Some("88"));
}

#[tokio::test]
async fn clear_and_resync_relinks_every_project() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", query_path().as_str())
        .match_query(query(FIND_ACME))
        .with_body(CUSTOMER_ACME)
        .create_async()
        .await;
    let job = server
        .mock("GET", query_path().as_str())
        .match_query(query(FIND_JOB_1290))
        .with_body(JOB_1290)
        .expect(1)
        .create_async()
        .await;

    let runtime = create_test_runtime(&server.url()).unwrap();
    runtime.exec_sql(UNSYNCED_PROJECT).await.unwrap();
    runtime
        .exec_sql("UPDATE engagements SET qbo_customer_id = '12', qbo_job_id = '87' WHERE id = 'e1';")
        .await
        .unwrap();
    connect(&runtime).await;

    let batch = runtime.engagement_sync().clear_and_resync().await.unwrap();
    job.assert_async().await;
    assert_eq!((batch.synced_count, batch.error_count, batch.total_count), (1, 0, 1));
    assert_eq!(batch.results[0].result.job_id.as_deref(), Some("88"));

    let report = runtime.engagement_sync().status_report().await.unwrap();
    assert_eq!(report.recently_synced[0].qbo_job_id.as_deref(), Some("88"));
}
