//! Rows and QuickBooks payloads shared by the integration tests

/// Project 1290 with Acme Builders as its primary customer, not yet linked to QuickBooks
pub const UNSYNCED_PROJECT: &str = r"
    INSERT INTO companies (id, name, company_type, is_customer) VALUES ('c1', 'Acme Builders', 'Contractor', 1);
    INSERT INTO engagements (id, name, project_number, type) VALUES ('e1', 'Lakeside Remodel', '1290', 'project');
    INSERT INTO engagement_parties (engagement_id, party_id, party_type, role, is_primary)
        VALUES ('e1', 'c1', 'company', 'customer', 1);
";

/// Project 1290 linked to job 88, with two pay apps that have no invoice yet
pub const BILLED_PROJECT: &str = r"
    INSERT INTO engagements (id, name, project_number, type, qbo_customer_id, qbo_job_id)
        VALUES ('e1', 'Lakeside Remodel', '1290', 'project', '58', '88');
    INSERT INTO engagement_pay_apps (id, engagement_id, pay_app_number, amount, current_payment_due, period_end, date_submitted)
        VALUES ('p1', 'e1', '1', 1500.0, 1500.0, '2024-03-31', '2024-04-02');
    INSERT INTO engagement_pay_apps (id, engagement_id, pay_app_number, amount, current_payment_due, period_end, date_submitted)
        VALUES ('p2', 'e1', '2', 2500.0, 2500.0, '2024-04-30', '2024-05-03');
";

pub const CUSTOMER_ACME: &str =
    r#"{"QueryResponse":{"Customer":[{"Id":"58","SyncToken":"0","DisplayName":"Acme Builders","CompanyName":"Acme Builders"}]}}"#;

pub const JOB_1290: &str = r#"{"QueryResponse":{"Customer":[
    {"Id":"87","DisplayName":"1290 Lakeside Remodel","Job":true,"ParentRef":{"value":"12"}},
    {"Id":"88","DisplayName":"1290 Lakeside Remodel","Job":true,"ParentRef":{"value":"58"}}
]}}"#;

pub const SERVICE_ITEM: &str =
    r#"{"QueryResponse":{"Item":[{"Id":"9","Name":"Construction Services","Type":"Service"}]}}"#;

pub const EMPTY_QUERY: &str = r#"{"QueryResponse":{}}"#;

pub const VENDORS: &str = r#"{"QueryResponse":{"Vendor":[
    {"Id":"201","DisplayName":"Acme Supply","PrimaryEmailAddr":{"Address":"orders@acmesupply.test"}},
    {"Id":"202","CompanyName":"Northside Electric","Vendor1099":true},
    {"Id":"203","DisplayName":"","CompanyName":""}
]}}"#;
