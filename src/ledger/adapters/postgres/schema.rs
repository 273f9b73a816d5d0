//! Diesel schema for the idempotency ledger.

diesel::table! {
    /// Accepted message identities.
    idempotency_ledger (message_id) {
        /// Message identity.
        #[max_length = 128]
        message_id -> Varchar,
        /// Acceptance timestamp.
        accepted_at -> Timestamptz,
    }
}
