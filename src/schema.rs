diesel::table! {
    devices (id) {
        id -> Integer,
        device_name -> Text,
    }
}

diesel::table! {
    testers (id) {
        id -> Integer,
        first_name -> Text,
        last_name -> Text,
        country -> Text,
        last_login -> Timestamp,
    }
}

diesel::table! {
    tester_devices (tester_id, device_id) {
        tester_id -> Integer,
        device_id -> Integer,
    }
}

diesel::table! {
    bugs (id) {
        id -> Integer,
        device_id -> Integer,
        tester_id -> Integer,
    }
}

diesel::table! {
    experiences (id) {
        id -> Integer,
        device_id -> Integer,
        tester_id -> Integer,
        bugs -> Integer,
    }
}

diesel::joinable!(tester_devices -> testers (tester_id));
diesel::joinable!(tester_devices -> devices (device_id));
diesel::joinable!(bugs -> devices (device_id));
diesel::joinable!(bugs -> testers (tester_id));
diesel::joinable!(experiences -> devices (device_id));
diesel::joinable!(experiences -> testers (tester_id));

diesel::allow_tables_to_appear_in_same_query!(devices, testers, tester_devices, bugs, experiences);
