//! Projection of a geocoding result into a flat address record.

use serde::{Deserialize, Serialize};

use crate::types::Place;

/// A geocoding result flattened into fixed address fields.
///
/// Every field is optional: upstream only returns the components that
/// exist at a location.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FormattedAddress {
  pub country: Option<String>,
  pub country_code: Option<String>,
  pub postcode: Option<String>,
  pub region: Option<String>,
  pub region_code: Option<String>,
  pub commune: Option<String>,
  pub district: Option<String>,
  pub street: Option<String>,
  pub place_type: Option<String>,
  pub display_name: Option<String>,
}

/// Flatten a place's address block into fixed fields.
///
/// Each field takes the first address component present in its fallback
/// chain: `region` is `state` then `region`, `commune` is `municipality`,
/// `city`, `town`, `village`, then `county`, and so on. Pure; no I/O.
pub fn format_location(place: &Place) -> FormattedAddress {
  let address = place.address.as_ref();

  let pick = |chain: &[&str]| -> Option<String> {
    let address = address?;
    chain.iter().find_map(|component| address.get(*component).cloned())
  };

  FormattedAddress {
    country: pick(&["country"]),
    country_code: pick(&["country_code"]),
    postcode: pick(&["postcode"]),
    region: pick(&["state", "region"]),
    region_code: pick(&["ISO3166-2-lvl4", "ISO3166-2-lvl6"]),
    commune: pick(&["municipality", "city", "town", "village", "county"]),
    district: pick(&[
      "city_district",
      "district",
      "borough",
      "suburb",
      "neighbourhood",
    ]),
    street: pick(&["road", "pedestrian", "footway"]),
    place_type: place
      .addresstype
      .clone()
      .or_else(|| Some(place.kind.clone())),
    display_name: Some(place.display_name.clone()),
  }
}
