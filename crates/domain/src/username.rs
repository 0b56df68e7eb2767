//! Username generation for ephemeral remote identities.

use uuid::Uuid;

/// Longest username the identity platform accepts.
pub const MAX_USERNAME_LENGTH: usize = 64;

/// Room kept for a dash and five significant random characters.
///
/// Five hex characters leave 16^5 (about one million) combinations per
/// prefix even when the human-readable part fills every other byte.
pub const RESERVED_SUFFIX_LENGTH: usize = 6;

/// Generates a unique username for an identity attached to `group_name`.
///
/// The readable prefix is `group_name`, followed by `-display_name` when a
/// display name is present. The prefix is cut to leave room for a random
/// suffix taken from a v4 UUID, then the whole name is cut to
/// [`MAX_USERNAME_LENGTH`]. Uniqueness comes from per-call randomness only.
#[must_use]
pub fn generate_username(display_name: &str, group_name: &str) -> String {
    let mut username = readable_prefix(display_name, group_name);
    username.push('-');
    username.push_str(Uuid::new_v4().simple().to_string().as_str());
    truncate_to(&mut username, MAX_USERNAME_LENGTH);
    username
}

/// Returns the human-readable part a generated username starts with.
#[must_use]
pub fn readable_prefix(display_name: &str, group_name: &str) -> String {
    let mut prefix = group_name.to_owned();
    if !display_name.is_empty() {
        prefix.push('-');
        prefix.push_str(display_name);
    }

    truncate_to(&mut prefix, MAX_USERNAME_LENGTH - RESERVED_SUFFIX_LENGTH);
    prefix
}

// Byte-length cut; backs off to a char boundary for non-ASCII input.
fn truncate_to(value: &mut String, max_len: usize) {
    if value.len() <= max_len {
        return;
    }

    let mut cut = max_len;
    while !value.is_char_boundary(cut) {
        cut -= 1;
    }
    value.truncate(cut);
}
