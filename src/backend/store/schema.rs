diesel::table! {
    catalog_entry (id) {
        id -> Int4,
        path -> Text,
        device -> Int8,
        inode -> Int8,
        file_size -> Int8,
        link_count -> Int8,
        mode -> Int4,
        owner -> Int4,
        file_group -> Int4,
        digest -> Nullable<Text>,
    }
}
