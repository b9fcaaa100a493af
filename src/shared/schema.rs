diesel::table! {
    meetings (id) {
        id -> Uuid,
        title -> Varchar,
        description -> Text,
        creator_urn -> Varchar,
        group_urn -> Nullable<Varchar>,
        video_room_sid -> Varchar,
        max_participants -> Int4,
        start_at -> Timestamptz,
        end_at -> Timestamptz,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    meeting_users (id) {
        id -> Uuid,
        meeting_id -> Uuid,
        user_urn -> Varchar,
        created_at -> Timestamptz,
    }
}

diesel::joinable!(meeting_users -> meetings (meeting_id));
diesel::allow_tables_to_appear_in_same_query!(meetings, meeting_users);
