use crate::common::constants::EARTH_RADIUS_MEAN_KM;
use crate::domain::Location;

/// Great-circle surface distance in km (haversine), ignoring depth.
pub fn horizontal_distance_km(lhs: &Location, rhs: &Location) -> f64 {
    let lat1 = lhs.latitude.to_radians();
    let lat2 = rhs.latitude.to_radians();
    let dlat = lat2 - lat1;
    let dlon = (rhs.longitude - lhs.longitude).to_radians();

    let sin_dlat = (dlat / 2.0).sin();
    let sin_dlon = (dlon / 2.0).sin();
    let a = sin_dlat * sin_dlat + lat1.cos() * lat2.cos() * sin_dlon * sin_dlon;
    let c = 2.0 * a.sqrt().min(1.0).asin();
    EARTH_RADIUS_MEAN_KM * c
}

pub fn min_horizontal_distance_km<'a>(
    site: &Location,
    points: impl IntoIterator<Item = &'a Location>,
) -> Option<f64> {
    points
        .into_iter()
        .map(|point| horizontal_distance_km(site, point))
        .min_by(f64::total_cmp)
}

/// Flat-earth azimuth from `from` to `to`, radians clockwise from north.
pub fn azimuth_rad(from: &Location, to: &Location) -> f64 {
    let dlat = to.latitude - from.latitude;
    let dlon = (to.longitude - from.longitude) * from.latitude.to_radians().cos();
    dlon.atan2(dlat)
}

/// Moves `origin` by `horizontal_km` along `azimuth` and `vertical_km` down,
/// using a local flat-earth approximation.
pub fn offset_location(
    origin: &Location,
    azimuth: f64,
    horizontal_km: f64,
    vertical_km: f64,
) -> Location {
    let km_per_degree = EARTH_RADIUS_MEAN_KM.to_radians();
    let dlat = horizontal_km * azimuth.cos() / km_per_degree;
    let dlon = horizontal_km * azimuth.sin() / (km_per_degree * origin.latitude.to_radians().cos());
    Location::new(
        origin.latitude + dlat,
        origin.longitude + dlon,
        origin.depth + vertical_km,
    )
}
