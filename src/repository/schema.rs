diesel::table! {
    propositions (id) {
        id -> Integer,
        identity_key -> Text,
        title -> Text,
        description -> Nullable<Text>,
        content -> Nullable<Text>,
        link -> Nullable<Text>,
        date -> Nullable<Date>,
        source -> Text,
        level -> Text,
        collection_type -> Text,
        relevance_score -> Nullable<Integer>,
        created_at -> Timestamp,
    }
}
