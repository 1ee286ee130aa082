use super::{lock, new_id};
use crate::error::FloconError;
use crate::repository::company_repository::CompanyRepository;
use crate::repository::SharedSqliteConnection;
use crate::types::{Company, CompanyUpdate, NewCompany};
use async_trait::async_trait;
use rusqlite::{params, OptionalExtension, Row};

pub struct SqliteCompanyRepository {
    connection: SharedSqliteConnection,
}

impl SqliteCompanyRepository {
    pub fn new(connection: SharedSqliteConnection) -> Self {
        Self { connection }
    }

    fn find_where(&self, condition: &str, value: &str) -> Result<Option<Company>, FloconError> {
        let conn = lock(&self.connection)?;
        let company = conn
            .query_row(
                &format!("{SELECT_COMPANY} WHERE {condition} LIMIT 1"),
                params![value],
                company_from_row,
            )
            .optional()?;
        Ok(company)
    }
}

const CREATE_COMPANY_TABLE_SQL: &str = r"
    CREATE TABLE IF NOT EXISTS companies (
        id TEXT PRIMARY KEY NOT NULL,
        name TEXT NOT NULL,
        company_type TEXT,
        email TEXT,
        phone TEXT,
        is_customer BOOLEAN,
        is_vendor BOOLEAN,
        is_subcontractor BOOLEAN,
        qbo_id TEXT,
        qbo_last_synced_at DATETIME
    );
";

const SELECT_COMPANY: &str = "SELECT id, name, company_type, email, phone, is_customer, is_vendor, is_subcontractor, qbo_id, qbo_last_synced_at FROM companies";

pub(crate) fn create_company_table(conn: &SharedSqliteConnection) -> Result<(), FloconError> {
    let conn = lock(conn)?;
    conn.execute(CREATE_COMPANY_TABLE_SQL, [])?;
    Ok(())
}

fn company_from_row(row: &Row<'_>) -> rusqlite::Result<Company> {
    Ok(Company {
        id: row.get(0)?,
        name: row.get(1)?,
        company_type: row.get(2)?,
        email: row.get(3)?,
        phone: row.get(4)?,
        is_customer: row.get(5)?,
        is_vendor: row.get(6)?,
        is_subcontractor: row.get(7)?,
        qbo_id: row.get(8)?,
        qbo_last_synced_at: row.get(9)?,
    })
}

#[async_trait]
impl CompanyRepository for SqliteCompanyRepository {
    async fn find_by_id(&self, id: &str) -> Result<Option<Company>, FloconError> {
        self.find_where("id = ?1", id)
    }

    async fn find_by_qbo_id(&self, qbo_id: &str) -> Result<Option<Company>, FloconError> {
        self.find_where("qbo_id = ?1", qbo_id)
    }

    async fn find_by_name_ignore_case(&self, name: &str) -> Result<Option<Company>, FloconError> {
        self.find_where("lower(name) = lower(?1)", name)
    }

    async fn insert(&self, company: &NewCompany) -> Result<Company, FloconError> {
        let id = new_id();
        {
            let conn = lock(&self.connection)?;
            conn.execute(
                "INSERT INTO companies (id, name, company_type, email, phone, is_customer, is_vendor, is_subcontractor, qbo_id, qbo_last_synced_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                params![
                    id,
                    company.name,
                    company.company_type,
                    company.email,
                    company.phone,
                    company.is_customer,
                    company.is_vendor,
                    company.is_subcontractor,
                    company.qbo_id,
                    company.qbo_last_synced_at,
                ],
            )?;
        }
        self.find_where("id = ?1", &id)?
            .ok_or_else(|| FloconError::NotFound(format!("Company {id} not found after insert")))
    }

    async fn update(&self, id: &str, update: &CompanyUpdate) -> Result<(), FloconError> {
        let conn = lock(&self.connection)?;
        conn.execute(
            "UPDATE companies SET
                name = COALESCE(?2, name),
                email = COALESCE(?3, email),
                phone = COALESCE(?4, phone),
                is_customer = COALESCE(?5, is_customer),
                is_vendor = COALESCE(?6, is_vendor),
                is_subcontractor = COALESCE(?7, is_subcontractor),
                qbo_id = COALESCE(?8, qbo_id),
                qbo_last_synced_at = COALESCE(?9, qbo_last_synced_at)
             WHERE id = ?1",
            params![
                id,
                update.name,
                update.email,
                update.phone,
                update.is_customer,
                update.is_vendor,
                update.is_subcontractor,
                update.qbo_id,
                update.qbo_last_synced_at,
            ],
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::sqlite::tests::setup;
    use chrono::Utc;

    fn new_vendor(name: &str, qbo_id: &str) -> NewCompany {
        NewCompany {
            name: name.to_string(),
            company_type: "Vendor".to_string(),
            email: Some("ap@example.com".to_string()),
            is_vendor: Some(true),
            qbo_id: qbo_id.to_string(),
            qbo_last_synced_at: Utc::now(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn insert_and_find() -> Result<(), FloconError> {
        let repo = SqliteCompanyRepository::new(setup()?);
        let created = repo.insert(&new_vendor("Acme Lumber", "56")).await?;

        assert_eq!(repo.find_by_qbo_id("56").await?.unwrap().id, created.id);
        assert_eq!(
            repo.find_by_name_ignore_case("ACME lumber").await?.unwrap().id,
            created.id
        );
        assert!(repo.find_by_name_ignore_case("Acme").await?.is_none());
        assert_eq!(created.is_vendor, Some(true));
        assert_eq!(created.is_customer, None);
        Ok(())
    }

    #[tokio::test]
    async fn update_leaves_absent_columns_alone() -> Result<(), FloconError> {
        let repo = SqliteCompanyRepository::new(setup()?);
        let created = repo.insert(&new_vendor("Acme Lumber", "56")).await?;

        repo.update(
            &created.id,
            &CompanyUpdate {
                phone: Some("555-0100".into()),
                is_subcontractor: Some(true),
                ..Default::default()
            },
        )
        .await?;

        let company = repo.find_by_id(&created.id).await?.unwrap();
        assert_eq!(company.phone.as_deref(), Some("555-0100"));
        assert_eq!(company.email.as_deref(), Some("ap@example.com"));
        assert_eq!(company.is_subcontractor, Some(true));
        assert_eq!(company.name, "Acme Lumber");
        Ok(())
    }
}
