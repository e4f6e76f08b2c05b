//! Postgres implementation of [`CatalogBackend`]

use async_trait::async_trait;
use shared::models::{
    Brand, CatalogColor, CatalogFamily, CatalogSku, CatalogVariant, DealerOffer, InsuranceRule,
    Lead, MarketSummaryRow, MediaAsset, PincodeRecord, PrimaryDealerMapping, RegistrationRule,
    StatePriceRecord, Tenant, VehicleType,
};
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

use super::tree::{CatalogRows, assemble_catalog_tree};
use super::{CatalogBackend, RepoError, RepoResult};

const GET_DEALER_OFFERS: &str = "get_dealer_offers";

/// Backend reading the hosted Postgres tables
#[derive(Clone)]
pub struct PgBackend {
    pool: PgPool,
}

impl PgBackend {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connect a pool of at most `max_connections`
    pub async fn connect(database_url: &str, max_connections: u32) -> RepoResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;
        Ok(Self::new(pool))
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl CatalogBackend for PgBackend {
    async fn fetch_market_summary(&self, state_code: &str) -> RepoResult<Vec<MarketSummaryRow>> {
        let rows = sqlx::query_as::<_, MarketSummaryRow>(
            r#"
            SELECT family_id::text AS family_id, state_code, lowest_price,
                   image_url, slug, sku_count::bigint AS sku_count
            FROM market_summary
            WHERE state_code = $1
            ORDER BY lowest_price ASC
            "#,
        )
        .bind(state_code)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn fetch_brands(&self, brand_ids: &[String]) -> RepoResult<Vec<Brand>> {
        if brand_ids.is_empty() {
            return Ok(vec![]);
        }
        let rows = sqlx::query_as::<_, Brand>(
            "SELECT id::text AS id, name, slug, logo_url FROM brands WHERE id::text = ANY($1)",
        )
        .bind(brand_ids)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn fetch_catalog_tree(
        &self,
        family_ids: Option<&[String]>,
    ) -> RepoResult<Vec<CatalogFamily>> {
        let families = sqlx::query_as::<_, CatalogFamily>(
            r#"
            SELECT f.id::text AS id, f.brand_id::text AS brand_id, b.name AS brand_name,
                   f.name, f.slug, f.category, f.status, f.image_url, f.price_base
            FROM catalog_families f
            LEFT JOIN brands b ON b.id = f.brand_id
            WHERE f.status = 'ACTIVE'
              AND f.category = 'VEHICLE'
              AND ($1::text[] IS NULL OR f.id::text = ANY($1))
            ORDER BY f.name
            "#,
        )
        .bind(family_ids.map(<[String]>::to_vec))
        .fetch_all(&self.pool)
        .await?;

        if families.is_empty() {
            return Ok(families);
        }
        let family_ids: Vec<String> = families.iter().map(|f| f.id.clone()).collect();

        let variants = sqlx::query_as::<_, CatalogVariant>(
            r#"
            SELECT id::text AS id, family_id::text AS family_id, name, slug, position
            FROM catalog_variants
            WHERE family_id::text = ANY($1)
            "#,
        )
        .bind(&family_ids)
        .fetch_all(&self.pool)
        .await?;
        let variant_ids: Vec<String> = variants.iter().map(|v| v.id.clone()).collect();

        let colors = sqlx::query_as::<_, CatalogColor>(
            r#"
            SELECT id::text AS id, variant_id::text AS variant_id, name, hex_code, position
            FROM catalog_colors
            WHERE variant_id::text = ANY($1)
            "#,
        )
        .bind(&variant_ids)
        .fetch_all(&self.pool)
        .await?;
        let color_ids: Vec<String> = colors.iter().map(|c| c.id.clone()).collect();

        let skus = sqlx::query_as::<_, CatalogSku>(
            r#"
            SELECT id::text AS id, color_id::text AS color_id, sku_code, price_base, is_primary
            FROM catalog_skus
            WHERE color_id::text = ANY($1)
            "#,
        )
        .bind(&color_ids)
        .fetch_all(&self.pool)
        .await?;
        let sku_ids: Vec<String> = skus.iter().map(|s| s.id.clone()).collect();

        let media = sqlx::query_as::<_, MediaAsset>(
            r#"
            SELECT id::text AS id, sku_id::text AS sku_id, url, kind, is_primary, position
            FROM catalog_sku_media
            WHERE sku_id::text = ANY($1)
            "#,
        )
        .bind(&sku_ids)
        .fetch_all(&self.pool)
        .await?;

        let prices = sqlx::query_as::<_, StatePriceRecord>(
            r#"
            SELECT vehicle_color_id::text AS vehicle_color_id, state_code, district,
                   ex_showroom_price, rto_total, insurance_total, on_road_price, is_active
            FROM vehicle_state_prices
            WHERE vehicle_color_id::text = ANY($1) AND is_active
            "#,
        )
        .bind(&sku_ids)
        .fetch_all(&self.pool)
        .await?;

        Ok(assemble_catalog_tree(CatalogRows {
            families,
            variants,
            colors,
            skus,
            media,
            prices,
        }))
    }

    async fn fetch_registration_rules(
        &self,
        state_code: &str,
    ) -> RepoResult<Vec<RegistrationRule>> {
        let rows = sqlx::query_as::<_, RegistrationRule>(
            r#"
            SELECT id::text AS id, state_code, rule_name, status, components
            FROM registration_rules
            WHERE state_code = $1 AND status = 'ACTIVE'
            "#,
        )
        .bind(state_code)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn fetch_insurance_rules(
        &self,
        state_code: &str,
        vehicle_type: VehicleType,
    ) -> RepoResult<Vec<InsuranceRule>> {
        let rows = sqlx::query_as::<_, InsuranceRule>(
            r#"
            SELECT id::text AS id, state_code, vehicle_type, status, priority,
                   od_rate_percent, tp_premium, gst_percent, addons
            FROM insurance_rules
            WHERE vehicle_type = $1
              AND status = 'ACTIVE'
              AND state_code IN ($2, 'ALL')
            ORDER BY (state_code = 'ALL') ASC, priority DESC
            "#,
        )
        .bind(vehicle_type.as_str())
        .bind(state_code)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn fetch_lead(&self, lead_id: &str) -> RepoResult<Option<Lead>> {
        let row = sqlx::query_as::<_, Lead>(
            r#"
            SELECT id::text AS id, customer_pincode, tenant_id::text AS tenant_id,
                   selected_dealer_tenant_id::text AS selected_dealer_tenant_id
            FROM crm_leads
            WHERE id::text = $1
            "#,
        )
        .bind(lead_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn fetch_pincode(&self, pincode: &str) -> RepoResult<Option<PincodeRecord>> {
        let row = sqlx::query_as::<_, PincodeRecord>(
            r#"
            SELECT pincode, district, state, state_code, latitude, longitude
            FROM pincodes
            WHERE pincode = $1
            LIMIT 1
            "#,
        )
        .bind(pincode)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn fetch_primary_dealer(
        &self,
        state_code: &str,
        district: &str,
    ) -> RepoResult<Option<PrimaryDealerMapping>> {
        let row = sqlx::query_as::<_, PrimaryDealerMapping>(
            r#"
            SELECT state_code, district, tenant_id::text AS tenant_id, is_active
            FROM dealer_district_primary
            WHERE state_code = $1 AND lower(district) = lower($2) AND is_active
            LIMIT 1
            "#,
        )
        .bind(state_code)
        .bind(district.trim())
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn get_dealer_offers(
        &self,
        tenant_id: &str,
        state_code: &str,
    ) -> RepoResult<Vec<DealerOffer>> {
        sqlx::query_as::<_, DealerOffer>(
            r#"
            SELECT dealer_id::text AS dealer_id, vehicle_color_id::text AS vehicle_color_id,
                   best_offer
            FROM get_dealer_offers($1::uuid, $2)
            "#,
        )
        .bind(tenant_id)
        .bind(state_code)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RepoError::Rpc {
            function: GET_DEALER_OFFERS.into(),
            message: e.to_string(),
        })
    }

    async fn fetch_tenants(&self, tenant_ids: &[String]) -> RepoResult<Vec<Tenant>> {
        if tenant_ids.is_empty() {
            return Ok(vec![]);
        }
        let rows = sqlx::query_as::<_, Tenant>(
            r#"
            SELECT id::text AS id, name, location, district, state_code,
                   studio_id::text AS studio_id
            FROM tenants
            WHERE id::text = ANY($1)
            "#,
        )
        .bind(tenant_ids)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn fetch_state_prices(
        &self,
        state_code: &str,
        districts: &[String],
        sku_ids: &[String],
    ) -> RepoResult<Vec<StatePriceRecord>> {
        if sku_ids.is_empty() {
            return Ok(vec![]);
        }
        let districts: Vec<String> = districts.iter().map(|d| d.trim().to_lowercase()).collect();
        let rows = sqlx::query_as::<_, StatePriceRecord>(
            r#"
            SELECT vehicle_color_id::text AS vehicle_color_id, state_code, district,
                   ex_showroom_price, rto_total, insurance_total, on_road_price, is_active
            FROM vehicle_state_prices
            WHERE state_code = $1
              AND lower(district) = ANY($2)
              AND is_active
              AND vehicle_color_id::text = ANY($3)
            "#,
        )
        .bind(state_code)
        .bind(&districts)
        .bind(sku_ids)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn count_active_skus(&self) -> RepoResult<i64> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*)
            FROM catalog_skus s
            JOIN catalog_colors c ON c.id = s.color_id
            JOIN catalog_variants v ON v.id = c.variant_id
            JOIN catalog_families f ON f.id = v.family_id
            WHERE f.status = 'ACTIVE' AND f.category = 'VEHICLE'
            "#,
        )
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }
}
