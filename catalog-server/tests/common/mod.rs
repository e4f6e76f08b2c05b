#![allow(dead_code)]

use std::sync::Arc;

use catalog_server::db::MemoryBackend;
use catalog_server::pricing::{CatalogController, CatalogPipeline, PipelineConfig};
use rust_decimal::Decimal;
use shared::models::{
    Brand, CatalogColor, CatalogFamily, CatalogSku, CatalogVariant, ComponentKind, DealerOffer,
    Lead, MediaAsset, PincodeRecord, PrimaryDealerMapping, RegistrationRule, RuleComponent,
    RuleStatus, StatePriceRecord, Tenant,
};

pub const SELECTED_DEALER: &str = "6ba7b810-9dad-41d1-80b4-00c04fd430c8";
pub const LEAD_TENANT: &str = "f47ac10b-58cc-4372-a567-0e02b2c3d479";
pub const PRIMARY_DEALER: &str = "886313e1-3b8a-5372-9b90-0c9aee199e5d";

pub const PUNE_CACHE: &str = r#"{"stateCode":"MH","district":"Pune"}"#;
pub const MUMBAI_CACHE: &str = r#"{"state":"Maharashtra","district":"Mumbai","pincode":400001}"#;

pub fn sku(id: &str, color_id: &str, price_base: i64) -> CatalogSku {
    CatalogSku {
        id: id.into(),
        color_id: color_id.into(),
        sku_code: id.to_uppercase(),
        price_base: Some(Decimal::from(price_base)),
        is_primary: true,
        media: vec![MediaAsset {
            id: format!("media-{id}"),
            sku_id: id.into(),
            url: format!("https://cdn.example/{id}.webp"),
            kind: "IMAGE".into(),
            is_primary: true,
            position: 0,
        }],
        prices: Vec::new(),
    }
}

/// One family, one variant, one red color, one SKU
pub fn family(family_id: &str, sku_id: &str, price_base: i64) -> CatalogFamily {
    let variant_id = format!("{family_id}-std");
    let color_id = format!("{family_id}-red");
    CatalogFamily {
        id: family_id.into(),
        brand_id: Some("brand-1".into()),
        brand_name: Some("Ather".into()),
        name: format!("Family {family_id}"),
        slug: family_id.into(),
        category: "VEHICLE".into(),
        status: "ACTIVE".into(),
        image_url: None,
        price_base: None,
        variants: vec![CatalogVariant {
            id: variant_id.clone(),
            family_id: family_id.into(),
            name: "Standard".into(),
            slug: format!("{family_id}-standard"),
            position: 0,
            colors: vec![CatalogColor {
                id: color_id.clone(),
                variant_id,
                name: "Red".into(),
                hex_code: Some("#C0392B".into()),
                position: 0,
                skus: vec![sku(sku_id, &color_id, price_base)],
            }],
        }],
    }
}

pub fn state_price(sku_id: &str, district: &str, on_road: i64) -> StatePriceRecord {
    StatePriceRecord {
        vehicle_color_id: sku_id.into(),
        state_code: "MH".into(),
        district: district.into(),
        ex_showroom_price: Decimal::from(on_road - 10000),
        rto_total: Some(Decimal::from(6000)),
        insurance_total: Some(Decimal::from(4000)),
        on_road_price: Some(Decimal::from(on_road)),
        is_active: true,
    }
}

pub fn offer(dealer_id: &str, sku_id: &str, delta: i64) -> DealerOffer {
    DealerOffer {
        dealer_id: dealer_id.into(),
        vehicle_color_id: sku_id.into(),
        best_offer: Decimal::from(delta),
    }
}

pub fn lead(id: &str, pincode: Option<&str>, tenant: Option<&str>, selected: Option<&str>) -> Lead {
    Lead {
        id: id.into(),
        customer_pincode: pincode.map(str::to_string),
        tenant_id: tenant.map(str::to_string),
        selected_dealer_tenant_id: selected.map(str::to_string),
    }
}

pub fn pune_pincode() -> PincodeRecord {
    PincodeRecord {
        pincode: "411001".into(),
        district: Some("Pune".into()),
        state: Some("Maharashtra".into()),
        state_code: Some("MH".into()),
        latitude: Some(18.52),
        longitude: Some(73.85),
    }
}

pub fn primary_mapping(district: &str, tenant_id: &str) -> PrimaryDealerMapping {
    PrimaryDealerMapping {
        state_code: "MH".into(),
        district: district.into(),
        tenant_id: tenant_id.into(),
        is_active: true,
    }
}

pub fn tenant(id: &str, name: &str) -> Tenant {
    Tenant {
        id: id.into(),
        name: name.into(),
        location: None,
        district: Some("Pune".into()),
        state_code: Some("MH".into()),
        studio_id: None,
    }
}

/// 10% road tax in MH
pub fn mh_registration() -> RegistrationRule {
    RegistrationRule {
        id: "rto-mh".into(),
        state_code: "MH".into(),
        rule_name: "MH road tax".into(),
        status: RuleStatus::Active,
        components: vec![RuleComponent {
            label: "Road tax".into(),
            kind: ComponentKind::Percentage,
            value: Decimal::from(10),
            min_amount: None,
            max_amount: None,
        }],
    }
}

/// Backend with one family (`fam-1` / `sku-1`, base 90000), a brand and MH rules
pub fn seeded_backend() -> Arc<MemoryBackend> {
    let backend = Arc::new(MemoryBackend::new());
    backend.add_brand(Brand {
        id: "brand-1".into(),
        name: "Ather".into(),
        slug: Some("ather".into()),
        logo_url: None,
    });
    backend.add_family(family("fam-1", "sku-1", 90000));
    backend.add_registration_rule(mh_registration());
    backend
}

pub fn pipeline(backend: Arc<MemoryBackend>, config: PipelineConfig) -> Arc<CatalogPipeline> {
    Arc::new(CatalogPipeline::new(backend, config))
}

pub fn controller(backend: Arc<MemoryBackend>) -> CatalogController {
    CatalogController::new(pipeline(backend, PipelineConfig::default()), true)
}

pub fn rupees(amount: i64) -> Decimal {
    Decimal::from(amount)
}
