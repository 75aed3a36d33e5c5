use rate_desk::domain::{
    compute_quote, AccessorialSelection, QuoteRequest, QuoteResult, ServiceType, TariffCard,
    TariffKey, TariffResolver, TariffSource, VehicleType,
};
use rate_desk::util::assets::{accessorial_catalog, fallback_override_table};

fn cents(value: f64) -> i64 {
    (value * 100.0).round() as i64
}

async fn atl_van() -> TariffCard {
    let resolver = TariffResolver::overrides_only(fallback_override_table());
    let key = TariffKey::new("atl", ServiceType::Standard, VehicleType::CargoVan);
    let (card, source) = resolver.resolve_with_source(&key).await.unwrap();
    assert_eq!(source, TariffSource::Override);
    card
}

fn base_request() -> QuoteRequest {
    QuoteRequest::new("ATL", VehicleType::CargoVan, 32.0, 750.0)
}

fn quote(tariff: &TariffCard, request: &QuoteRequest) -> QuoteResult {
    compute_quote(tariff, request, accessorial_catalog())
}

fn assert_components_sum(result: &QuoteResult) {
    assert_eq!(
        cents(result.total),
        cents(result.transportation_subtotal)
            + cents(result.fuel_surcharge)
            + cents(result.accessorial_subtotal)
    );
}

#[tokio::test]
async fn cargo_van_base_scenario() {
    let tariff = atl_van().await;
    let result = quote(&tariff, &base_request());

    assert_eq!(result.billable_distance, 12.0);
    assert_eq!(result.excess_distance_charge, 24.0);
    assert_eq!(result.billable_weight, 650.0);
    assert_eq!(result.weight_surcharge, 65.0);
    assert_eq!(result.transportation_subtotal, 194.0);
    assert_eq!(result.fuel_surcharge, 48.5);
    assert!(result.accessorials.is_empty());
    assert_eq!(result.total, 242.5);
    assert_components_sum(&result);
}

#[tokio::test]
async fn deadhead_is_billed_from_the_first_mile() {
    let tariff = atl_van().await;
    let result = quote(&tariff, &base_request().with_deadhead(10.0));

    assert_eq!(result.deadhead_charge, 20.0);
    assert_eq!(result.transportation_subtotal, 214.0);
    assert_eq!(result.fuel_surcharge, 53.5);
    assert_eq!(result.total, 267.5);
    assert_components_sum(&result);
}

#[tokio::test]
async fn extra_stops_do_not_change_fuel() {
    let tariff = atl_van().await;
    let request = base_request().with_accessorial(AccessorialSelection::with_count("extra_stop", 2));
    let result = quote(&tariff, &request);

    assert_eq!(result.accessorial_subtotal, 100.0);
    assert_eq!(result.fuel_surcharge, 48.5);
    assert_eq!(result.total, 342.5);
    assert_components_sum(&result);
}

#[tokio::test]
async fn distance_within_included_miles_has_no_excess_line() {
    let tariff = atl_van().await;
    for distance in [0.0, 5.0, 19.99, 20.0] {
        let request = QuoteRequest::new("ATL", VehicleType::CargoVan, distance, 50.0);
        let result = quote(&tariff, &request);

        assert_eq!(result.excess_distance_charge, 0.0);
        assert!(result
            .charge_lines()
            .iter()
            .all(|line| !line.label.to_lowercase().contains("mileage")));
        assert_eq!(result.charge_lines().len(), 1);
        assert_eq!(result.total, 131.25);
    }
}

#[tokio::test]
async fn fuel_ignores_every_accessorial() {
    let tariff = atl_van().await;
    let plain = quote(&tariff, &base_request());

    let mut loaded = base_request();
    for definition in accessorial_catalog().iter() {
        loaded = loaded.with_accessorial(AccessorialSelection::with_count(&definition.key, 3));
    }
    let loaded = quote(&tariff, &loaded);

    assert_eq!(loaded.accessorials.len(), accessorial_catalog().len());
    assert_eq!(loaded.fuel_surcharge, plain.fuel_surcharge);
    assert_eq!(loaded.transportation_subtotal, plain.transportation_subtotal);
    assert_components_sum(&loaded);
}

#[tokio::test]
async fn attempt_charge_matches_base_rate() {
    let tariff = atl_van().await;
    for (distance, weight) in [(0.0, 0.0), (32.0, 750.0), (400.0, 3000.0)] {
        let request = QuoteRequest::new("ATL", VehicleType::CargoVan, distance, weight)
            .with_accessorial(AccessorialSelection::on("attempt"));
        let result = quote(&tariff, &request);

        let attempt = result
            .accessorials
            .iter()
            .find(|line| line.key == "attempt")
            .unwrap();
        assert_eq!(attempt.amount, tariff.base_rate);
    }
}

#[tokio::test]
async fn extra_stop_counts_multiply_the_unit_price() {
    let tariff = atl_van().await;
    let unit = accessorial_catalog().get("extra_stop").unwrap().flat_amount;

    let three = quote(
        &tariff,
        &base_request().with_accessorial(AccessorialSelection::with_count("extra_stop", 3)),
    );
    assert_eq!(three.accessorials[0].amount, 3.0 * unit);

    let default = quote(
        &tariff,
        &base_request().with_accessorial(AccessorialSelection::on("extra_stop")),
    );
    assert_eq!(default.accessorials[0].amount, unit);
}

#[tokio::test]
async fn wait_time_bills_each_block() {
    let tariff = atl_van().await;
    let per_block = accessorial_catalog().get("wait_time").unwrap().flat_amount;

    let none = quote(
        &tariff,
        &base_request().with_accessorial(AccessorialSelection::with_count("wait_time", 0)),
    );
    assert!(none.accessorials.is_empty());
    assert_eq!(none.accessorial_subtotal, 0.0);

    for blocks in [1, 4, 9] {
        let result = quote(
            &tariff,
            &base_request().with_accessorial(AccessorialSelection::with_count("wait_time", blocks)),
        );
        assert_eq!(result.accessorials.len(), 1);
        assert_eq!(result.accessorials[0].amount, blocks as f64 * per_block);
    }
}

#[tokio::test]
async fn discount_parts_add_back_to_total() {
    let tariff = atl_van().await;
    let request = base_request()
        .with_deadhead(7.0)
        .with_accessorial(AccessorialSelection::on("liftgate"));

    for pct in [20.0, 25.0, 30.0, 40.0] {
        let result = quote(&tariff, &request.clone().with_discount(pct));
        let discount = result.discount.clone().unwrap();

        assert_eq!(
            cents(discount.amount) + cents(discount.discounted_total),
            cents(result.total)
        );
        assert_eq!(
            cents(discount.discounted_total),
            cents(result.total * (1.0 - pct / 100.0))
        );
        assert_eq!(result.amount_due(), discount.discounted_total);
    }
}

#[tokio::test]
async fn rush_lane_resolves_its_own_card() {
    let resolver = TariffResolver::overrides_only(fallback_override_table());
    let key = TariffKey::new("ATL", ServiceType::Rush, VehicleType::CargoVan);
    let rush = resolver.resolve(&key).await.unwrap();
    assert!(rush.base_rate > atl_van().await.base_rate);
}
