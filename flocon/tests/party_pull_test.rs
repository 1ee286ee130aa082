#[cfg(test)]
#[allow(dead_code)]
mod test_helpers;

use crate::test_helpers::common::{connect, create_test_runtime, query, query_path};
use crate::test_helpers::fixtures::VENDORS;
use flocon::types::PullAction;
use mockito::Server;

const LIST_VENDORS: &str = "SELECT * FROM Vendor MAXRESULTS 1000";

#[tokio::test]
async fn vendors_are_linked_by_name_or_created() {
    let mut server = Server::new_async().await;
    let vendors = server
        .mock("GET", query_path().as_str())
        .match_query(query(LIST_VENDORS))
        .with_body(VENDORS)
        .expect(2)
        .create_async()
        .await;

    let runtime = create_test_runtime(&server.url()).unwrap();
    runtime
        .exec_sql("INSERT INTO companies (id, name, company_type) VALUES ('c7', 'ACME SUPPLY', 'Vendor');")
        .await
        .unwrap();
    connect(&runtime).await;

    let first = runtime.party_pull().pull_vendors().await;
    assert!(first.success);
    assert_eq!((first.created, first.updated, first.skipped, first.total), (1, 1, 1, 3));
    assert_eq!(first.vendors[0].name, "Acme Supply");
    assert_eq!(first.vendors[0].action, PullAction::Updated);
    assert_eq!(first.vendors[1].name, "Northside Electric");
    assert_eq!(first.vendors[1].action, PullAction::Created);

    // Both are known by their QuickBooks id now
    let second = runtime.party_pull().pull_vendors().await;
    vendors.assert_async().await;
    assert_eq!((second.created, second.updated), (0, 2));
}

#[tokio::test]
async fn subcontractors_are_the_1099_vendors() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", query_path().as_str())
        .match_query(query(LIST_VENDORS))
        .with_body(VENDORS)
        .create_async()
        .await;

    let runtime = create_test_runtime(&server.url()).unwrap();
    connect(&runtime).await;

    let result = runtime.party_pull().pull_subcontractors().await;
    assert_eq!((result.created, result.total), (1, 1));
    assert_eq!(result.vendors[0].qbo_id, "202");
}

#[tokio::test]
async fn jobs_are_not_pulled_as_customers() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", query_path().as_str())
        .match_query(query("SELECT * FROM Customer MAXRESULTS 1000"))
        .with_body(
            r#"{"QueryResponse":{"Customer":[
                {"Id":"58","DisplayName":"Acme Builders"},
                {"Id":"88","DisplayName":"1290 Lakeside Remodel","Job":true,"ParentRef":{"value":"58"}}
            ]}}"#,
        )
        .create_async()
        .await;

    let runtime = create_test_runtime(&server.url()).unwrap();
    connect(&runtime).await;

    let result = runtime.party_pull().pull_customers().await;
    assert!(result.success);
    assert_eq!((result.created, result.total), (1, 1));
    assert_eq!(result.vendors[0].name, "Acme Builders");
}
