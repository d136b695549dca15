use crate::config::TRENDING_MIN_CHANGE_PCT;
use crate::error::Result;
use crate::marketplace::MarketplaceClient;
use crate::types::TrendingCollection;

/// Collections listed per trending query.
const TRENDING_FETCH_LIMIT: usize = 50;

pub async fn find_trending(client: &dyn MarketplaceClient) -> Result<Vec<TrendingCollection>> {
    let listing = client.fetch_trending_collections(TRENDING_FETCH_LIMIT).await?;
    Ok(rank(listing))
}

/// Keep collections whose one-day change exceeds the trending threshold,
/// strongest movers first.
pub fn rank(collections: Vec<TrendingCollection>) -> Vec<TrendingCollection> {
    let mut trending: Vec<TrendingCollection> = collections
        .into_iter()
        .filter(|c| c.one_day_change_pct.is_finite() && c.one_day_change_pct > TRENDING_MIN_CHANGE_PCT)
        .collect();
    trending.sort_by(|a, b| {
        b.one_day_change_pct
            .total_cmp(&a.one_day_change_pct)
            .then_with(|| b.one_day_volume.total_cmp(&a.one_day_volume))
    });
    trending
}
