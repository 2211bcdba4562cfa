table! {
    equipment (id) {
        id -> Int4,
        owner_id -> Int4,
        category_id -> Int4,
        title -> Varchar,
        description -> Text,
        brand -> Varchar,
        model -> Varchar,
        condition -> Varchar,
        daily_rate -> Numeric,
        weekly_rate -> Nullable<Numeric>,
        monthly_rate -> Nullable<Numeric>,
        security_deposit -> Numeric,
        is_available_for_pickup -> Bool,
        is_available_for_delivery -> Bool,
        delivery_fee -> Numeric,
        location_city -> Varchar,
        location_state -> Varchar,
        status -> Varchar,
        total_rentals -> Int4,
        total_revenue -> Numeric,
        average_rating -> Numeric,
        view_count -> Int4,
        created_at -> Timestamp,
        updated_at -> Timestamp,
        last_rented -> Nullable<Timestamp>,
    }
}

table! {
    equipment_categories (id) {
        id -> Int4,
        name -> Varchar,
        description -> Text,
        icon -> Varchar,
        is_active -> Bool,
    }
}

table! {
    messages (id) {
        id -> Int4,
        rental_id -> Nullable<Int4>,
        sender_id -> Int4,
        recipient_id -> Int4,
        subject -> Varchar,
        body -> Text,
        is_read -> Bool,
        is_system_message -> Bool,
        created_at -> Timestamp,
        read_at -> Nullable<Timestamp>,
    }
}

table! {
    payments (id) {
        id -> Int4,
        rental_id -> Int4,
        payer_id -> Int4,
        payment_type -> Varchar,
        payment_method -> Varchar,
        amount -> Numeric,
        status -> Varchar,
        gateway_order_id -> Nullable<Varchar>,
        gateway_capture_id -> Nullable<Varchar>,
        gateway_payer_id -> Nullable<Varchar>,
        gateway_email -> Nullable<Varchar>,
        processed_at -> Nullable<Timestamp>,
        created_at -> Timestamp,
    }
}

table! {
    rentals (id) {
        id -> Int4,
        equipment_id -> Int4,
        renter_id -> Int4,
        owner_id -> Int4,
        start_date -> Date,
        end_date -> Date,
        actual_return_date -> Nullable<Date>,
        daily_rate -> Numeric,
        total_days -> Int4,
        subtotal -> Numeric,
        security_deposit -> Numeric,
        delivery_fee -> Numeric,
        service_fee -> Numeric,
        total_amount -> Numeric,
        delivery_required -> Bool,
        delivery_address -> Text,
        status -> Varchar,
        approved_at -> Nullable<Timestamp>,
        confirmed_at -> Nullable<Timestamp>,
        started_at -> Nullable<Timestamp>,
        completed_at -> Nullable<Timestamp>,
        renter_notes -> Text,
        owner_notes -> Text,
        created_at -> Timestamp,
        updated_at -> Timestamp,
    }
}

table! {
    reviews (id) {
        id -> Int4,
        rental_id -> Int4,
        reviewer_id -> Int4,
        reviewee_id -> Int4,
        equipment_id -> Int4,
        reviewer_type -> Varchar,
        rating -> Int4,
        communication_rating -> Nullable<Int4>,
        condition_rating -> Nullable<Int4>,
        timeliness_rating -> Nullable<Int4>,
        title -> Varchar,
        comment -> Text,
        is_public -> Bool,
        created_at -> Timestamp,
    }
}

table! {
    sensor_readings (id) {
        id -> Int4,
        sensor_id -> Int4,
        value -> Varchar,
        unit -> Varchar,
        quality_score -> Nullable<Numeric>,
        is_alert -> Bool,
        recorded_at -> Timestamp,
    }
}

table! {
    sensors (id) {
        id -> Int4,
        name -> Varchar,
        sensor_type -> Varchar,
        equipment_id -> Nullable<Int4>,
        current_value -> Nullable<Varchar>,
        last_reading -> Nullable<Timestamp>,
        status -> Varchar,
        is_active -> Bool,
        reading_interval_minutes -> Int4,
        alert_threshold -> Nullable<Varchar>,
        description -> Text,
        manufacturer -> Varchar,
        model_number -> Varchar,
        serial_number -> Varchar,
        created_at -> Timestamp,
    }
}

table! {
    user_profiles (id) {
        id -> Int4,
        user_id -> Int4,
        bio -> Text,
        city -> Varchar,
        state -> Varchar,
        country -> Varchar,
        gaming_experience -> Varchar,
        favorite_genres -> Varchar,
        updated_at -> Timestamp,
        total_rentals_as_renter -> Int4,
        total_rentals_as_owner -> Int4,
        total_earnings -> Numeric,
        average_rating_as_renter -> Numeric,
        average_rating_as_owner -> Numeric,
    }
}

table! {
    users (id) {
        id -> Int4,
        username -> Varchar,
        email -> Varchar,
        password_hash -> Varchar,
        first_name -> Varchar,
        last_name -> Varchar,
        role -> Varchar,
        phone_number -> Nullable<Varchar>,
        is_active -> Bool,
        is_staff -> Bool,
        is_email_verified -> Bool,
        email_verification_token -> Nullable<Varchar>,
        created_at -> Timestamp,
        last_login -> Nullable<Timestamp>,
    }
}

table! {
    wishlist (id) {
        id -> Int4,
        user_id -> Int4,
        equipment_id -> Int4,
        notify_when_available -> Bool,
        max_daily_rate -> Nullable<Numeric>,
        created_at -> Timestamp,
    }
}

joinable!(equipment -> equipment_categories (category_id));
joinable!(equipment -> users (owner_id));
joinable!(payments -> rentals (rental_id));
joinable!(payments -> users (payer_id));
joinable!(rentals -> equipment (equipment_id));
joinable!(reviews -> equipment (equipment_id));
joinable!(reviews -> rentals (rental_id));
joinable!(sensor_readings -> sensors (sensor_id));
joinable!(sensors -> equipment (equipment_id));
joinable!(user_profiles -> users (user_id));
joinable!(wishlist -> equipment (equipment_id));
joinable!(wishlist -> users (user_id));

allow_tables_to_appear_in_same_query!(
    equipment,
    equipment_categories,
    messages,
    payments,
    rentals,
    reviews,
    sensor_readings,
    sensors,
    user_profiles,
    users,
    wishlist,
);
