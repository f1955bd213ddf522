mod common;

use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use common::TestDb;
use invoice_ledger::db::{queries, schema};
use invoice_ledger::models::{Client, DateRange, Invoice, InvoiceLineItem};
use invoice_ledger::LedgerError;
use std::str::FromStr;

fn dec(s: &str) -> BigDecimal {
    BigDecimal::from_str(s).unwrap()
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

async fn fresh_db() -> TestDb {
    let db = TestDb::connect().await;
    schema::apply_schema(&db.pool).await.unwrap();
    db
}

/// C1 / I1 / L1 示例数据
async fn seed_example(db: &TestDb) {
    let client = Client::new("C1", "Acme").with_industry("Tech").with_country("UK");
    let invoice = Invoice::new("I1", "C1").with_status("overdue").with_currency("USD");
    let item = InvoiceLineItem::new("L1", "I1")
        .with_service("Consulting")
        .with_pricing(dec("2.0000"), dec("100.0000"), dec("0.2000"));

    queries::insert_client(&db.pool, &client).await.unwrap();
    queries::insert_invoice(&db.pool, &invoice).await.unwrap();
    queries::insert_line_item(&db.pool, &item).await.unwrap();
}

#[tokio::test]
#[ignore = "requires Postgres (LEDGER_TEST_DATABASE_URL)"]
async fn example_scenario_returns_single_line_item() {
    let db = fresh_db().await;
    seed_example(&db).await;

    let items = queries::line_items_for_invoice(&db.pool, "I1").await.unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].service_name.as_deref(), Some("Consulting"));
    assert_eq!(items[0].line_total_including_tax(), Some(dec("240")));

    let uk = queries::clients_by_country(&db.pool, "UK").await.unwrap();
    assert_eq!(uk.len(), 1);
    assert_eq!(uk[0].client_name, "Acme");

    db.cleanup().await;
}

#[tokio::test]
#[ignore = "requires Postgres (LEDGER_TEST_DATABASE_URL)"]
async fn invoice_with_unknown_client_is_rejected() {
    let db = fresh_db().await;

    let err = queries::insert_invoice(&db.pool, &Invoice::new("I1", "NOPE"))
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::ForeignKeyViolation { .. }), "{err:?}");
    assert_eq!(queries::table_counts(&db.pool).await.unwrap().invoices, 0);

    db.cleanup().await;
}

#[tokio::test]
#[ignore = "requires Postgres (LEDGER_TEST_DATABASE_URL)"]
async fn line_item_with_unknown_invoice_is_rejected() {
    let db = fresh_db().await;
    queries::insert_client(&db.pool, &Client::new("C1", "Acme")).await.unwrap();

    let err = queries::insert_line_item(&db.pool, &InvoiceLineItem::new("L1", "NOPE"))
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::ForeignKeyViolation { .. }), "{err:?}");
    assert!(err.is_constraint_violation());

    db.cleanup().await;
}

#[tokio::test]
#[ignore = "requires Postgres (LEDGER_TEST_DATABASE_URL)"]
async fn duplicate_primary_key_is_rejected() {
    let db = fresh_db().await;
    queries::insert_client(&db.pool, &Client::new("C1", "Acme")).await.unwrap();

    let err = queries::insert_client(&db.pool, &Client::new("C1", "Other"))
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::DuplicateKey { .. }), "{err:?}");

    let stored = queries::get_client(&db.pool, "C1").await.unwrap().unwrap();
    assert_eq!(stored.client_name, "Acme");

    db.cleanup().await;
}

#[tokio::test]
#[ignore = "requires Postgres (LEDGER_TEST_DATABASE_URL)"]
async fn deleting_referenced_client_fails() {
    let db = fresh_db().await;
    seed_example(&db).await;

    let err: LedgerError = sqlx::query("DELETE FROM clients WHERE client_id = 'C1'")
        .execute(&db.pool)
        .await
        .unwrap_err()
        .into();
    assert!(matches!(err, LedgerError::ForeignKeyViolation { .. }), "{err:?}");

    db.cleanup().await;
}

#[tokio::test]
#[ignore = "requires Postgres (LEDGER_TEST_DATABASE_URL)"]
async fn decimals_round_trip_exactly() {
    let db = fresh_db().await;
    queries::insert_client(&db.pool, &Client::new("C1", "Acme")).await.unwrap();
    queries::insert_invoice(
        &db.pool,
        &Invoice::new("I1", "C1").with_fx_rate(dec("1.234567")),
    )
    .await
    .unwrap();
    queries::insert_line_item(
        &db.pool,
        &InvoiceLineItem::new("L1", "I1").with_pricing(dec("3"), dec("19.9900"), dec("0.0750")),
    )
    .await
    .unwrap();

    let item = &queries::line_items_for_invoice(&db.pool, "I1").await.unwrap()[0];
    assert_eq!(item.unit_price.as_ref().unwrap().to_string(), "19.9900");
    assert_eq!(item.tax_rate.as_ref().unwrap().to_string(), "0.0750");
    assert_eq!(item.quantity.as_ref().unwrap().to_string(), "3.0000");

    let invoice = queries::get_invoice(&db.pool, "I1").await.unwrap().unwrap();
    assert_eq!(invoice.fx_rate_to_usd.unwrap().to_string(), "1.234567");

    db.cleanup().await;
}

#[tokio::test]
#[ignore = "requires Postgres (LEDGER_TEST_DATABASE_URL)"]
async fn numeric_overflow_is_an_invalid_value() {
    let db = fresh_db().await;
    seed_example(&db).await;

    let item = InvoiceLineItem::new("L2", "I1").with_pricing(
        dec("1"),
        dec("1000000000000000"),
        dec("0"),
    );
    let err = queries::insert_line_item(&db.pool, &item).await.unwrap_err();
    assert!(matches!(err, LedgerError::InvalidValue { .. }), "{err:?}");

    db.cleanup().await;
}

#[tokio::test]
#[ignore = "requires Postgres (LEDGER_TEST_DATABASE_URL)"]
async fn invoices_for_client_respects_inclusive_range() {
    let db = fresh_db().await;
    queries::insert_client(&db.pool, &Client::new("C1", "Acme")).await.unwrap();
    queries::insert_client(&db.pool, &Client::new("C2", "Globex")).await.unwrap();
    for (id, client, day) in [("I1", "C1", 1), ("I2", "C1", 15), ("I3", "C1", 31), ("I4", "C2", 15)] {
        let invoice = Invoice::new(id, client).with_dates(date(2024, 1, day), date(2024, 2, day.min(28)));
        queries::insert_invoice(&db.pool, &invoice).await.unwrap();
    }
    queries::insert_invoice(&db.pool, &Invoice::new("I5", "C1")).await.unwrap();

    let all = queries::invoices_for_client(&db.pool, "C1", DateRange::default())
        .await
        .unwrap();
    assert_eq!(all.len(), 4);

    let range = DateRange::between(date(2024, 1, 15), date(2024, 1, 31));
    let ids: Vec<String> = queries::invoices_for_client(&db.pool, "C1", range)
        .await
        .unwrap()
        .into_iter()
        .map(|i| i.invoice_id)
        .collect();
    assert_eq!(ids, vec!["I2", "I3"]);

    let open_start = DateRange {
        from: None,
        to: Some(date(2024, 1, 1)),
    };
    let ids: Vec<String> = queries::invoices_for_client(&db.pool, "C1", open_start)
        .await
        .unwrap()
        .into_iter()
        .map(|i| i.invoice_id)
        .collect();
    assert_eq!(ids, vec!["I1"]);

    db.cleanup().await;
}

#[tokio::test]
#[ignore = "requires Postgres (LEDGER_TEST_DATABASE_URL)"]
async fn status_filter_is_exact_and_overdue_is_derived() {
    let db = fresh_db().await;
    queries::insert_client(&db.pool, &Client::new("C1", "Acme")).await.unwrap();

    let invoices = [
        Invoice::new("I1", "C1").with_status("overdue"),
        Invoice::new("I2", "C1").with_dates(date(2024, 1, 1), date(2024, 1, 31)).with_status("Paid"),
        Invoice::new("I3", "C1").with_dates(date(2024, 1, 1), date(2024, 1, 31)).with_status("sent"),
        Invoice::new("I4", "C1").with_dates(date(2024, 1, 1), date(2024, 1, 31)),
        Invoice::new("I5", "C1").with_dates(date(2024, 3, 1), date(2024, 3, 31)).with_status("sent"),
    ];
    for invoice in &invoices {
        queries::insert_invoice(&db.pool, invoice).await.unwrap();
    }

    let exact = queries::invoices_by_status(&db.pool, "paid").await.unwrap();
    assert!(exact.is_empty());
    let exact = queries::invoices_by_status(&db.pool, "Paid").await.unwrap();
    assert_eq!(exact.len(), 1);

    let mut overdue: Vec<String> = queries::overdue_invoices(&db.pool, date(2024, 2, 15))
        .await
        .unwrap()
        .into_iter()
        .map(|i| i.invoice_id)
        .collect();
    overdue.sort();
    assert_eq!(overdue, vec!["I1", "I3", "I4"]);

    db.cleanup().await;
}

#[tokio::test]
#[ignore = "requires Postgres (LEDGER_TEST_DATABASE_URL)"]
async fn service_totals_treat_unknown_as_unknown() {
    let db = fresh_db().await;
    seed_example(&db).await;

    let unpriced = InvoiceLineItem::new("L2", "I1").with_service("Consulting");
    let hosting = InvoiceLineItem::new("L3", "I1").with_service("Hosting");
    queries::insert_line_item(&db.pool, &unpriced).await.unwrap();
    queries::insert_line_item(&db.pool, &hosting).await.unwrap();

    let totals = queries::service_totals(&db.pool).await.unwrap();
    assert_eq!(totals.len(), 2);

    let consulting = totals
        .iter()
        .find(|t| t.service_name.as_deref() == Some("Consulting"))
        .unwrap();
    assert_eq!(consulting.line_count, 2);
    assert_eq!(consulting.priced_lines, 1);
    assert_eq!(consulting.unpriced_lines(), 1);
    assert_eq!(consulting.total_including_tax, Some(dec("240")));

    let hosting = totals
        .iter()
        .find(|t| t.service_name.as_deref() == Some("Hosting"))
        .unwrap();
    assert_eq!(hosting.priced_lines, 0);
    assert_eq!(hosting.total_including_tax, None);

    let by_service = queries::line_items_by_service(&db.pool, "Consulting").await.unwrap();
    assert_eq!(by_service.len(), 2);

    db.cleanup().await;
}

#[tokio::test]
#[ignore = "requires Postgres (LEDGER_TEST_DATABASE_URL)"]
async fn client_totals_are_scoped_to_the_invoice_year() {
    let db = fresh_db().await;

    for (id, name) in [("C1", "Acme"), ("C2", "Beta"), ("C3", "Gamma")] {
        queries::insert_client(&db.pool, &Client::new(id, name)).await.unwrap();
    }
    let invoices = [
        ("I1", "C1", date(2024, 3, 10)),
        ("I2", "C2", date(2024, 12, 31)),
        ("I3", "C3", date(2024, 6, 1)),
        ("I4", "C1", date(2023, 12, 31)),
        ("I5", "C3", date(2022, 5, 5)),
    ];
    for (id, client, day) in invoices {
        let invoice = Invoice::new(id, client).with_dates(day, day);
        queries::insert_invoice(&db.pool, &invoice).await.unwrap();
    }
    let items = [
        InvoiceLineItem::new("L1", "I1").with_pricing(dec("2"), dec("100"), dec("0.2")),
        InvoiceLineItem::new("L2", "I1"),
        InvoiceLineItem::new("L3", "I2").with_pricing(dec("1"), dec("500"), dec("0")),
        InvoiceLineItem::new("L4", "I3"),
        InvoiceLineItem::new("L5", "I4").with_pricing(dec("10"), dec("1000"), dec("0")),
        InvoiceLineItem::new("L6", "I5"),
    ];
    for item in &items {
        queries::insert_line_item(&db.pool, item).await.unwrap();
    }

    let totals = queries::client_totals_for_year(&db.pool, 2024).await.unwrap();
    let ids: Vec<&str> = totals.iter().map(|t| t.client_id.as_str()).collect();
    assert_eq!(ids, ["C2", "C1", "C3"]);
    assert_eq!(totals[0].total_including_tax, Some(dec("500")));
    assert_eq!(totals[1].total_including_tax, Some(dec("240")));
    assert_eq!(totals[1].line_count, 2);
    assert_eq!(totals[1].unpriced_lines(), 1);
    assert_eq!(totals[2].priced_lines, 0);
    assert_eq!(totals[2].total_including_tax, None);

    let top = queries::top_client_for_year(&db.pool, 2024).await.unwrap().unwrap();
    assert_eq!(top.client_id, "C2");
    assert_eq!(top.client_name, "Beta");

    let top_2023 = queries::top_client_for_year(&db.pool, 2023).await.unwrap().unwrap();
    assert_eq!(top_2023.client_id, "C1");
    assert_eq!(top_2023.total_including_tax, Some(dec("10000")));

    // 只有未计价明细的年份没有最高客户
    assert_eq!(queries::client_totals_for_year(&db.pool, 2022).await.unwrap().len(), 1);
    assert!(queries::top_client_for_year(&db.pool, 2022).await.unwrap().is_none());
    assert!(queries::client_totals_for_year(&db.pool, 2025).await.unwrap().is_empty());

    db.cleanup().await;
}

#[tokio::test]
#[ignore = "requires Postgres (LEDGER_TEST_DATABASE_URL)"]
async fn invoices_for_month_uses_calendar_bounds() {
    let db = fresh_db().await;
    queries::insert_client(&db.pool, &Client::new("C1", "Acme")).await.unwrap();

    let days = [
        ("I1", date(2024, 1, 31)),
        ("I2", date(2024, 2, 1)),
        ("I3", date(2024, 2, 29)),
        ("I4", date(2024, 3, 1)),
        ("I5", date(2024, 12, 31)),
        ("I6", date(2025, 1, 1)),
    ];
    for (id, day) in days {
        let invoice = Invoice::new(id, "C1").with_dates(day, day);
        queries::insert_invoice(&db.pool, &invoice).await.unwrap();
    }
    queries::insert_invoice(&db.pool, &Invoice::new("I7", "C1")).await.unwrap();

    let february = queries::invoices_for_month(&db.pool, 2024, 2).await.unwrap();
    let ids: Vec<&str> = february.iter().map(|i| i.invoice_id.as_str()).collect();
    assert_eq!(ids, ["I2", "I3"]);

    let december = queries::invoices_for_month(&db.pool, 2024, 12).await.unwrap();
    assert_eq!(december.len(), 1);
    assert_eq!(december[0].invoice_id, "I5");

    for month in [0, 13] {
        let err = queries::invoices_for_month(&db.pool, 2024, month).await.unwrap_err();
        assert!(matches!(err, LedgerError::InvalidValue { .. }), "{:?}", err);
    }

    db.cleanup().await;
}
