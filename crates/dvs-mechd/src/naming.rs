//! Port-group naming.
//!
//! A port-group is found again purely by its name, so the name must be a
//! pure function of the network and must be usable on the controller.

use crate::error::{DvsError, DvsResult};
use dvs_types::Network;

/// Maximum length of a derived port-group name.
pub const MAX_NET_NAME_LEN: usize = 80;

/// Derives the port-group name for a network.
///
/// The name is `"<display name>-<id>"`, or the id alone when the network has
/// no display name. It may contain only ASCII letters, digits, `-` and `_`,
/// and may be at most [`MAX_NET_NAME_LEN`] characters long.
///
/// # Examples
///
/// ```
/// use dvs_mechd::portgroup_name;
/// use dvs_types::Network;
///
/// let net = Network::new("abc", Some("foo"));
/// assert_eq!(portgroup_name(&net).unwrap(), "foo-abc");
///
/// let net = Network::new("abc", None);
/// assert_eq!(portgroup_name(&net).unwrap(), "abc");
/// ```
pub fn portgroup_name(network: &Network) -> DvsResult<String> {
    let name = match network.display_name() {
        Some(display) => format!("{}-{}", display, network.id),
        None => network.id.clone(),
    };

    let len = name.chars().count();
    if len > MAX_NET_NAME_LEN {
        return Err(DvsError::invalid_name(
            &network.id,
            &name,
            format!("{} characters exceeds the limit of {}", len, MAX_NET_NAME_LEN),
        ));
    }

    if let Some(bad) = name.chars().find(|c| !is_name_char(*c)) {
        return Err(DvsError::invalid_name(
            &network.id,
            &name,
            format!("illegal character {:?}", bad),
        ));
    }

    Ok(name)
}

fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '-' || c == '_'
}
