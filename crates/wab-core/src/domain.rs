/// The "user" part of a JID: substring before `@`, then before a `:` device suffix.
///
/// `15551234567:12@s.whatsapp.net` -> `15551234567`.
pub fn jid_user(jid: &str) -> &str {
    let before_at = jid.split('@').next().unwrap_or(jid);
    before_at.split(':').next().unwrap_or(before_at)
}
