use connect_core::domain::{Charge, ChargeKind, MonetaryValue, Packaging, Rate, Weight};
use connect_core::validation::assert;
use connect_core::validation::pattern::CURRENCY_CODE;
use connect_core::validation::{field, optional, Rule, Schema};
use connect_core::{
    construct, to_pojo, BuildContext, ErrorCode, PipelinePolicy, ReferenceErrorKind, ReferenceMap,
    ZeroChargeCurrency,
};
use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;

const BOX_ID: &str = "20000000-0000-4000-8000-000000000002";

#[test]
fn schema_mode_reports_every_violation_assert_mode_stops_at_first() {
    let schema = Schema::new(
        "invoice line",
        Rule::object([
            field("sku", Rule::string()),
            field("currency", Rule::string().pattern(&CURRENCY_CODE)),
            optional("quantity", Rule::integer().positive()),
        ]),
    );
    let payload = json!({ "sku": "  ", "currency": "usd", "quantity": 0, "color": "red" });

    let err = schema.validate(&payload).expect_err("payload is invalid");
    assert_eq!(err.code(), ErrorCode::Validation);
    assert_eq!(err.label(), "invoice line");
    assert_eq!(err.len(), 4, "{err}");

    let first = assert::string(payload.get("sku"), "sku", None).expect_err("blank sku");
    assert_eq!(first.len(), 1);
    assert_eq!(first.violations()[0].path.to_string(), "sku");
}

#[test]
fn assert_helpers_apply_defaults_for_absent_values() {
    assert_eq!(assert::string(None, "name", Some("unnamed")).unwrap(), "unnamed");
    assert!(assert::boolean(Some(&json!(null)), "flag", Some(true)).unwrap());
    assert!(assert::boolean(Some(&json!("yes")), "flag", Some(true)).is_err());
    assert_eq!(assert::optional_count(None, "days").unwrap(), None);
    assert!(assert::uuid(Some(&json!("nope")), "id").is_err());
}

#[test]
fn reference_map_shares_instances_until_sealed() {
    let mut refs = ReferenceMap::new("test carrier");
    let fragment = json!({ "id": BOX_ID, "name": "Medium Box" });
    {
        let mut cx = BuildContext::loading(&mut refs, PipelinePolicy::default());
        let first = cx.resolve::<Packaging>(&fragment).unwrap();
        let copy = cx.resolve::<Packaging>(&fragment.clone()).unwrap();
        assert!(Arc::ptr_eq(&first, &copy));
    }
    assert!(refs.is_loading());
    assert_eq!(refs.len(), 1);

    refs.finished_loading();
    let id = Uuid::parse_str(BOX_ID).unwrap();
    assert!(refs.lookup::<Packaging>(id, "packaging").is_ok());
    assert!(refs.get::<Packaging>(&fragment).unwrap().is_none());

    let err = refs
        .add(Arc::new(1_u8), &json!({ "id": BOX_ID }), "number")
        .expect_err("sealed map must reject additions");
    assert_eq!(err.kind, ReferenceErrorKind::Sealed);
    assert_eq!(err.code(), ErrorCode::Configuration);

    let collision = refs
        .lookup::<Weight>(id, "weight")
        .expect_err("a packaging is not a weight");
    assert_eq!(collision.kind, ReferenceErrorKind::TypeCollision);
}

#[test]
fn rate_round_trips_through_its_wire_form() {
    let mut refs = ReferenceMap::new("test carrier");
    let service = json!({
        "id": "30000000-0000-4000-8000-000000000003",
        "name": "Ground",
        "code": "ground",
        "class": "ground"
    });
    let raw = json!({
        "deliveryService": service,
        "minimumDeliveryDays": 2,
        "maximumDeliveryDays": 2,
        "isGuaranteed": true,
        "charges": [
            { "name": "Base", "type": "shipping", "amount": { "value": 8.0, "currency": "CAD" } },
            { "type": "insurance", "amount": { "value": 0.5, "currency": "CAD" } }
        ],
        "totalAmount": { "value": 8.5, "currency": "CAD" },
        "notes": ["signature required"]
    });

    let mut cx = BuildContext::loading(&mut refs, PipelinePolicy::default());
    let rate = construct::<Rate>(&raw, &mut cx).expect("rate should build");
    assert_eq!(rate.total_amount().to_string(), "8.50 CAD");
    assert_eq!(rate.charges()[0].name(), Some("Base"));
    assert_eq!(rate.notes(), ["signature required".to_string()]);

    let rendered = to_pojo(&rate).unwrap();
    assert_eq!(rendered["deliveryService"], json!("30000000-0000-4000-8000-000000000003"));
    assert_eq!(rendered["charges"][1]["type"], json!("insurance"));

    let rebuilt = construct::<Rate>(&rendered, &mut cx).expect("wire form should rebuild");
    assert_eq!(rebuilt, rate);
}

#[test]
fn rate_rejects_inconsistent_delivery_window_and_total() {
    let mut refs = ReferenceMap::new("test carrier");
    let mut cx = BuildContext::loading(&mut refs, PipelinePolicy::default());
    let base = json!({
        "deliveryService": {
            "id": "30000000-0000-4000-8000-000000000003",
            "name": "Ground",
            "code": "ground",
            "class": "ground"
        },
        "charges": [{ "type": "shipping", "amount": { "value": 8.0, "currency": "CAD" } }]
    });

    let mut window = base.clone();
    window["minimumDeliveryDays"] = json!(5);
    window["maximumDeliveryDays"] = json!(3);
    let err = construct::<Rate>(&window, &mut cx).expect_err("min > max");
    assert!(err.to_string().contains("must not exceed maximumDeliveryDays (5 > 3)"), "{err}");

    let mut total = base;
    total["totalAmount"] = json!({ "value": 9.0, "currency": "CAD" });
    let err = construct::<Rate>(&total, &mut cx).expect_err("declared total must match");
    assert!(err.to_string().contains("must equal the sum of charges"), "{err}");
}

#[test]
fn monetary_totals_follow_the_zero_charge_policy() {
    let charges = vec![
        Charge::new(ChargeKind::Shipping, MonetaryValue::new(12.0, "USD").unwrap()),
        Charge::new(ChargeKind::Duty, MonetaryValue::new(0.0, "EUR").unwrap()),
    ];

    let err = connect_core::domain::total_charges(&charges, ZeroChargeCurrency::Count)
        .expect_err("zero charges count by default");
    assert_eq!(err.currencies, vec!["USD".to_string(), "EUR".to_string()]);

    let total = connect_core::domain::total_charges(&charges, ZeroChargeCurrency::Ignore)
        .unwrap()
        .expect("non-empty charges have a total");
    assert_eq!(total.value(), 12.0);
    assert_eq!(total.currency(), "USD");
}
