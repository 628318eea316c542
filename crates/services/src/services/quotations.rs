use db::models::{
    email_notification::EmailNotification,
    quotation::{CreateQuotationRequest, QuotationRequest, QuotationStatus, UpdateQuotationRequest},
};
use sqlx::SqlitePool;
use thiserror::Error;
use tracing::info;
use utils::text::{non_blank, non_blank_str};
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum QuotationError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("quotation request not found")]
    NotFound,
    #[error("{0}")]
    Validation(String),
}

fn admin_alert(quote: &QuotationRequest) -> (String, String) {
    let subject = format!("New quotation request from {}", quote.customer_name);
    let mut body = format!(
        "Customer: {}\nJob: {}\n",
        quote.customer_name, quote.job_description
    );
    for (label, value) in [
        ("Company", quote.company_name.as_deref()),
        ("Email", quote.customer_email.as_deref()),
        ("Phone", quote.customer_phone.as_deref()),
        ("Paper", quote.paper_details.as_deref()),
        ("Size", quote.size.as_deref()),
        ("Notes", quote.notes.as_deref()),
    ] {
        if let Some(value) = value {
            body.push_str(&format!("{label}: {value}\n"));
        }
    }
    if let Some(quantity) = quote.quantity {
        body.push_str(&format!("Quantity: {quantity}\n"));
    }
    (subject, body)
}

fn customer_quote(quote: &QuotationRequest, amount: f64) -> (String, String) {
    (
        "Your print quotation".to_string(),
        format!(
            "Dear {},\n\nThank you for your enquiry about \"{}\".\nOur quotation: Rs. {:.2}\n\nPlease reply to this email to confirm the order.",
            quote.customer_name, quote.job_description, amount
        ),
    )
}

pub struct QuotationService;

impl QuotationService {
    pub async fn list(
        pool: &SqlitePool,
        status: Option<QuotationStatus>,
    ) -> Result<Vec<QuotationRequest>, QuotationError> {
        Ok(QuotationRequest::find_all(pool, status).await?)
    }

    /// Store a public enquiry and queue an alert for the shop when an
    /// admin address is configured.
    pub async fn submit(
        pool: &SqlitePool,
        data: &CreateQuotationRequest,
        admin_email: Option<&str>,
    ) -> Result<QuotationRequest, QuotationError> {
        let customer_name = non_blank_str(data.customer_name.as_deref())
            .ok_or_else(|| QuotationError::Validation("customer_name is required".into()))?;
        let job_description = non_blank_str(data.job_description.as_deref())
            .ok_or_else(|| QuotationError::Validation("job_description is required".into()))?;
        let data = CreateQuotationRequest {
            customer_email: non_blank(data.customer_email.clone()),
            customer_phone: non_blank(data.customer_phone.clone()),
            ..data.clone()
        };
        match (&data.customer_email, &data.customer_phone) {
            (None, None) => {
                return Err(QuotationError::Validation(
                    "customer_email or customer_phone is required".into(),
                ));
            }
            (Some(email), _) if !email.contains('@') => {
                return Err(QuotationError::Validation(
                    "customer_email is not a valid email address".into(),
                ));
            }
            _ => {}
        }
        if data.quantity.is_some_and(|q| q <= 0) {
            return Err(QuotationError::Validation("quantity must be greater than zero".into()));
        }

        let mut tx = db::begin_write(pool).await?;
        let quote =
            QuotationRequest::create(&mut *tx, Uuid::new_v4(), customer_name, job_description, &data)
                .await?;
        if let Some(admin_email) = admin_email {
            let (subject, body) = admin_alert(&quote);
            EmailNotification::enqueue(&mut *tx, admin_email, &subject, &body).await?;
        }
        tx.commit().await?;

        info!(quotation_id = %quote.id, alerted = admin_email.is_some(), "quotation request received");
        Ok(quote)
    }

    /// Moving a request to `quoted` with an amount emails the customer.
    pub async fn update(
        pool: &SqlitePool,
        id: Uuid,
        data: &UpdateQuotationRequest,
    ) -> Result<QuotationRequest, QuotationError> {
        if data
            .quoted_amount
            .is_some_and(|amount| !amount.is_finite() || amount < 0.0)
        {
            return Err(QuotationError::Validation(
                "quoted_amount must be a non-negative number".into(),
            ));
        }
        let existing = QuotationRequest::find_by_id(pool, id)
            .await?
            .ok_or(QuotationError::NotFound)?;

        let mut tx = db::begin_write(pool).await?;
        let quote = QuotationRequest::update(&mut *tx, id, data)
            .await?
            .ok_or(QuotationError::NotFound)?;

        let newly_quoted =
            quote.status == QuotationStatus::Quoted && existing.status != QuotationStatus::Quoted;
        if newly_quoted
            && let (Some(amount), Some(email)) = (quote.quoted_amount, quote.customer_email.as_deref())
        {
            let (subject, body) = customer_quote(&quote, amount);
            EmailNotification::enqueue(&mut *tx, email, &subject, &body).await?;
        }
        tx.commit().await?;

        info!(quotation_id = %id, status = %quote.status, "quotation request updated");
        Ok(quote)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::test_db;

    fn enquiry() -> CreateQuotationRequest {
        CreateQuotationRequest {
            customer_name: Some("Priya Nair".into()),
            customer_email: Some("priya@example.com".into()),
            job_description: Some("500 wedding invitations, gold foil".into()),
            quantity: Some(500),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn submission_queues_admin_alert() {
        let (db, _dir) = test_db().await;
        let quote = QuotationService::submit(&db.pool, &enquiry(), Some("owner@shop.in"))
            .await
            .unwrap();
        assert_eq!(quote.status, QuotationStatus::Pending);

        let pending = EmailNotification::find_pending(&db.pool, 10).await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].recipient, "owner@shop.in");
        assert!(pending[0].body.contains("gold foil"));

        QuotationService::submit(&db.pool, &enquiry(), None).await.unwrap();
        assert_eq!(EmailNotification::find_pending(&db.pool, 10).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn contact_details_are_required() {
        let (db, _dir) = test_db().await;
        let err = QuotationService::submit(
            &db.pool,
            &CreateQuotationRequest {
                customer_email: Some(" ".into()),
                customer_phone: None,
                ..enquiry()
            },
            None,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, QuotationError::Validation(_)));

        let phone_only = QuotationService::submit(
            &db.pool,
            &CreateQuotationRequest {
                customer_email: None,
                customer_phone: Some("98450 12345".into()),
                ..enquiry()
            },
            None,
        )
        .await
        .unwrap();
        assert!(phone_only.customer_email.is_none());
    }

    #[tokio::test]
    async fn quoting_emails_customer_once() {
        let (db, _dir) = test_db().await;
        let quote = QuotationService::submit(&db.pool, &enquiry(), None).await.unwrap();

        let update = UpdateQuotationRequest {
            status: Some(QuotationStatus::Quoted),
            quoted_amount: Some(7250.0),
            notes: None,
        };
        let quoted = QuotationService::update(&db.pool, quote.id, &update).await.unwrap();
        assert_eq!(quoted.quoted_amount, Some(7250.0));
        QuotationService::update(&db.pool, quote.id, &update).await.unwrap();

        let pending = EmailNotification::find_pending(&db.pool, 10).await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].recipient, "priya@example.com");
        assert!(pending[0].body.contains("7250.00"));

        assert!(matches!(
            QuotationService::update(&db.pool, Uuid::new_v4(), &update).await,
            Err(QuotationError::NotFound)
        ));
    }
}
