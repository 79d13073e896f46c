pub(crate) mod stealth;
