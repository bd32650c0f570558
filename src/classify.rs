//! Pure classification heuristics: food genre, distance bucket, quality score.
//!
//! No I/O and no failure paths — everything here is a stateless lookup over
//! already-extracted fields.

use rand::Rng;

/// Classify a raw category string into one of the fixed genre buckets.
pub fn food_genre(category: &str) -> &'static str {
    let c = category.to_lowercase();
    let any = |keys: &[&str]| keys.iter().any(|k| c.contains(k));

    if any(&["한식", "김치", "된장", "불고기", "비빔밥"]) {
        "한식"
    } else if any(&["일식", "초밥", "라멘", "우동", "돈카츠"]) {
        "일식"
    } else if any(&["중식", "짜장", "짬뽕", "탕수육", "마파두부"]) {
        "중식"
    } else if any(&["양식", "파스타", "스테이크", "피자", "햄버거"]) {
        "양식"
    } else if any(&["카페", "커피", "디저트", "케이크", "빵"]) {
        "카페/디저트"
    } else if any(&["분식", "떡볶이", "순대", "튀김", "김밥"]) {
        "분식/간식"
    } else {
        "기타"
    }
}

/// Estimated walking distance from the office, in meters.
///
/// The source exposes no coordinates on list pages, so the estimate is a
/// bounded draw per region, matching the upstream datamart.
pub fn distance_from_office_m(region_name: &str) -> u32 {
    let mut rng = rand::thread_rng();
    match region_name {
        "남대문" => rng.gen_range(100..=300),
        "서울역" => rng.gen_range(400..=800),
        "회현역" => rng.gen_range(200..=500),
        _ => rng.gen_range(300..=1000),
    }
}

/// Bucket a distance into the display category.
pub fn distance_category(distance_m: u32) -> &'static str {
    match distance_m {
        0..=200 => "매우 가까움",
        201..=500 => "가까움",
        501..=1000 => "보통",
        _ => "조금 멀음",
    }
}

/// Walking time at 80 m/min, at least one minute.
pub fn walking_time_min(distance_m: u32) -> u32 {
    (distance_m / 80).max(1)
}

/// Whether the distance is within a comfortable walk.
pub fn is_walkable(distance_m: u32) -> bool {
    distance_m <= 1500
}

/// Data quality score in [0, 100].
///
/// Rating contributes up to 40 points, review volume up to 30, and a
/// plausible address the final 30. An unobserved rating contributes nothing.
pub fn quality_score(rating: Option<f64>, review_count: u32, address: &str) -> f64 {
    let mut score = 0.0;
    if let Some(r) = rating {
        if r > 0.0 {
            score += (r * 8.0).min(40.0);
        }
    }
    if review_count > 0 {
        score += (review_count as f64 / 10.0).min(30.0);
    }
    if address.chars().count() > 5 {
        score += 30.0;
    }
    score.min(100.0)
}

/// Quality bucket used by the run metadata artifact.
pub fn quality_bucket(score: f64) -> &'static str {
    if score >= 80.0 {
        "excellent"
    } else if score >= 60.0 {
        "good"
    } else if score >= 40.0 {
        "fair"
    } else {
        "poor"
    }
}
