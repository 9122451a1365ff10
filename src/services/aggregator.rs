// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Normalization of backend fortune payloads.
//!
//! Each of the four services returns its own JSON document shape, and the
//! fields inside are all optional. Everything here converts those loose
//! payloads into a strict [`FortuneResult`] exactly once, at the edge:
//! fixed section headers, bullets in a stable order, and placeholders for
//! absent fields. The rendered text never contains the literal words
//! `null` or `undefined`.

use std::collections::{HashMap, HashSet};

use serde::Deserialize;

use crate::models::{FortuneResult, ServiceKind};

/// Placeholder for an absent optional field.
const PLACEHOLDER: &str = "-";

const DREAM_EMPTY: &str = "해몽 데이터가 준비되지 않았습니다.";
const DAILY_EMPTY: &str = "오늘의 운세 데이터가 준비되지 않았습니다.";
const LIFE_EMPTY: &str = "추후 평생 운세 상세가 준비됩니다.";

// ─────────────────────────────────────────────────────────────────────────────
// Wire shapes
// ─────────────────────────────────────────────────────────────────────────────

/// A field that some backend revisions send as a string and others as a
/// list of strings.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum StringOrList {
    One(String),
    Many(Vec<String>),
}

impl StringOrList {
    /// Flatten to a list, splitting single strings on commas, semicolons
    /// and newlines.
    pub fn into_list(&self) -> Vec<String> {
        match self {
            StringOrList::One(value) => value
                .split([',', ';', '\n'])
                .map(str::trim)
                .filter(|part| !part.is_empty())
                .map(String::from)
                .collect(),
            StringOrList::Many(values) => values
                .iter()
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
                .collect(),
        }
    }
}

/// Face-reading payload (`/api/fortune/face/{id}`).
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FaceReadingData {
    pub id: Option<String>,
    pub overall_impression: FaceOverall,
    pub eye: FaceFeature,
    pub nose: FaceFeature,
    pub mouth: FaceFeature,
    pub advice: FaceAdvice,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FaceOverall {
    pub overall_impression: Option<String>,
    pub overall_fortune: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FaceFeature {
    pub feature: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FaceAdvice {
    pub keyword: Option<String>,
    pub caution: Option<StringOrList>,
    pub main_advice: Option<String>,
    pub summary: Option<String>,
    pub tomorrow_hint: Option<String>,
}

/// Dream-interpretation payload (`/api/fortune/dream/{id}`).
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DreamData {
    pub id: Option<String>,
    pub summary: Option<String>,
    pub symbol_interpretation: DreamSymbol,
    pub psychological_analysis: DreamTips,
    pub fortune_prospects: DreamProspects,
    pub precautions: Precautions,
    pub advice_and_luck: DreamAdvice,
    pub special_message: DreamMessage,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DreamSymbol {
    pub symbol_text: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DreamTips {
    pub tip1: Option<String>,
    pub tip2: Option<String>,
    pub tip3: Option<String>,
    pub tip4: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DreamProspects {
    pub short_term_outlook: Option<String>,
    pub medium_term_outlook: Option<String>,
    pub long_term_outlook: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Precautions {
    pub precaution1: Option<String>,
    pub precaution2: Option<String>,
    pub precaution3: Option<String>,
    pub precaution4: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DreamAdvice {
    pub advice1: Option<String>,
    pub advice2: Option<String>,
    pub advice3: Option<String>,
    pub advice4: Option<String>,
    pub advice5: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DreamMessage {
    pub message_text: Option<String>,
}

/// Daily-fortune payload (`/api/fortune/daily/{id}`).
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DailyFortuneData {
    pub id: Option<String>,
    pub fortune_date: Option<String>,
    pub overall_rating: Option<u32>,
    pub overall_summary: Option<String>,
    pub wealth: DailyWealth,
    pub love: DailyLove,
    pub career: NumberedTips,
    pub health: NumberedTips,
    pub keywords: LuckyKeywords,
    pub precautions: Precautions,
    pub advice: DailyAdvice,
    pub tomorrow_preview: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DailyWealth {
    pub wealth_summary: Option<String>,
    pub wealth_tip1: Option<String>,
    pub wealth_tip2: Option<String>,
    pub lotto_numbers: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DailyLove {
    pub single: Option<String>,
    pub in_relationship: Option<String>,
    pub married: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct NumberedTips {
    pub tip1: Option<String>,
    pub tip2: Option<String>,
    pub tip3: Option<String>,
    pub tip4: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LuckyKeywords {
    pub lucky_colors: Option<String>,
    pub lucky_numbers: Option<String>,
    pub lucky_times: Option<String>,
    pub lucky_direction: Option<String>,
    pub good_foods: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DailyAdvice {
    pub advice_text: Option<String>,
}

/// Life-long fortune payload (`/api/fortune/total/{id}`).
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LifeFortuneData {
    pub id: Option<String>,
    pub personality: LifePersonality,
    pub wealth: LifeWealth,
    pub love_and_marriage: LifeLove,
    pub career: LifeCareer,
    pub health: LifeHealth,
    pub turning_points: TurningPoints,
    pub good_luck: LifeLuck,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LifePersonality {
    pub strength: Option<String>,
    pub talent: Option<String>,
    pub responsibility: Option<String>,
    pub empathy: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LifeWealth {
    pub twenties: Option<String>,
    pub thirties: Option<String>,
    pub forties: Option<String>,
    pub fifties_and_beyond: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LifeLove {
    pub first_love: Option<String>,
    pub marriage_age: Option<String>,
    pub spouse_meeting: Option<String>,
    pub married_life: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LifeCareer {
    pub successful_fields: Option<String>,
    pub career_change_age: Option<String>,
    pub leadership_style: Option<String>,
    pub entrepreneurship: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LifeHealth {
    pub general_health: Option<String>,
    pub weak_point: Option<String>,
    pub checkup_reminder: Option<String>,
    pub recommended_exercise: Option<String>,
}

/// The backend labels the three turning points with German ordinals.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TurningPoints {
    pub ein: Option<String>,
    pub zwei: Option<String>,
    pub drei: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LifeLuck {
    pub lucky_colors: Option<String>,
    pub lucky_numbers: Option<String>,
    pub lucky_direction: Option<String>,
    pub good_days: Option<String>,
    pub avoidances: Option<String>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Normalization
// ─────────────────────────────────────────────────────────────────────────────

/// Tagged union of the four payload shapes, formed at the wire boundary.
#[derive(Debug, Clone)]
pub enum FortunePayload {
    FaceReading(FaceReadingData),
    LifeFortune(LifeFortuneData),
    DailyFortune(DailyFortuneData),
    Dream(DreamData),
}

impl FortunePayload {
    pub fn kind(&self) -> ServiceKind {
        match self {
            FortunePayload::FaceReading(_) => ServiceKind::FaceReading,
            FortunePayload::LifeFortune(_) => ServiceKind::LifeFortune,
            FortunePayload::DailyFortune(_) => ServiceKind::DailyFortune,
            FortunePayload::Dream(_) => ServiceKind::Dream,
        }
    }

    /// Server-assigned result id, when the payload carries one.
    pub fn server_id(&self) -> Option<&str> {
        match self {
            FortunePayload::FaceReading(data) => data.id.as_deref(),
            FortunePayload::LifeFortune(data) => data.id.as_deref(),
            FortunePayload::DailyFortune(data) => data.id.as_deref(),
            FortunePayload::Dream(data) => data.id.as_deref(),
        }
    }
}

/// Convert a backend payload into the single internal result shape.
pub fn normalize(
    id: impl Into<String>,
    created_at: &str,
    paid: bool,
    payload: &FortunePayload,
) -> FortuneResult {
    let kind = payload.kind();
    let content = match payload {
        FortunePayload::FaceReading(data) => build_face_text(data),
        FortunePayload::LifeFortune(data) => build_life_text(data),
        FortunePayload::DailyFortune(data) => build_daily_text(data),
        FortunePayload::Dream(data) => build_dream_text(data),
    };

    FortuneResult {
        id: id.into(),
        kind,
        title: kind.result_title().to_string(),
        content,
        date: display_date(created_at),
        paid,
    }
}

/// `2024-01-15T10:30:00` → `2024.01.15`
pub fn display_date(created_at: &str) -> String {
    created_at
        .split('T')
        .next()
        .unwrap_or("")
        .replace('-', ".")
}

fn bullet(out: &mut Vec<String>, label: &str, value: &Option<String>) {
    if let Some(value) = non_empty(value) {
        out.push(format!("• {}: {}", label, value));
    }
}

fn close_section(out: &mut Vec<String>) {
    out.push(String::new());
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

fn or_placeholder(value: &Option<String>) -> &str {
    non_empty(value).unwrap_or(PLACEHOLDER)
}

/// Join collected lines, dropping trailing blank lines; `fallback` when
/// nothing was emitted at all.
fn finish(mut out: Vec<String>, fallback: &str) -> String {
    while out.last().is_some_and(|line| line.is_empty()) {
        out.pop();
    }
    if out.is_empty() {
        return fallback.to_string();
    }
    out.join("\n")
}

/// Face text always renders every section; missing fields show as `-`.
fn build_face_text(data: &FaceReadingData) -> String {
    let mut out = Vec::new();

    out.push("🧾 전체 인상".to_string());
    out.push(format!(
        "- 설명: {}",
        or_placeholder(&data.overall_impression.overall_impression)
    ));
    out.push(format!(
        "- 운세: {}",
        or_placeholder(&data.overall_impression.overall_fortune)
    ));
    close_section(&mut out);

    out.push("👁 눈".to_string());
    out.push(format!("- 특징: {}", or_placeholder(&data.eye.feature)));
    close_section(&mut out);

    out.push("👃 코".to_string());
    out.push(format!("- 특징: {}", or_placeholder(&data.nose.feature)));
    close_section(&mut out);

    out.push("👄 입".to_string());
    out.push(format!("- 특징: {}", or_placeholder(&data.mouth.feature)));
    close_section(&mut out);

    out.push("💡 조언".to_string());
    out.push(format!("- 키워드: {}", or_placeholder(&data.advice.keyword)));

    let cautions = data
        .advice
        .caution
        .as_ref()
        .map(StringOrList::into_list)
        .unwrap_or_default();
    if cautions.is_empty() {
        out.push(format!("- 주의: {}", PLACEHOLDER));
    } else {
        out.push("- 주의:".to_string());
        for (index, caution) in cautions.iter().enumerate() {
            out.push(format!("  {}. {}", index + 1, caution));
        }
    }

    // Some revisions call the field `summary`, older ones `mainAdvice`
    let main_advice = non_empty(&data.advice.summary)
        .or_else(|| non_empty(&data.advice.main_advice))
        .unwrap_or(PLACEHOLDER);
    out.push(format!("- 핵심 조언: {}", main_advice));
    if let Some(hint) = non_empty(&data.advice.tomorrow_hint) {
        out.push(format!("- 내일 힌트: {}", hint));
    }

    finish(out, PLACEHOLDER)
}

fn build_dream_text(data: &DreamData) -> String {
    let mut out = Vec::new();

    if let Some(summary) = non_empty(&data.summary) {
        out.push("✨ 요약".to_string());
        out.push(summary.to_string());
        close_section(&mut out);
    }

    if let Some(symbol) = non_empty(&data.symbol_interpretation.symbol_text) {
        out.push("🔮 상징 해석".to_string());
        out.push(symbol.to_string());
        close_section(&mut out);
    }

    let tips = &data.psychological_analysis;
    if [&tips.tip1, &tips.tip2, &tips.tip3, &tips.tip4]
        .iter()
        .any(|tip| non_empty(tip).is_some())
    {
        out.push("🧠 심리 분석".to_string());
        bullet(&mut out, "Tip1", &tips.tip1);
        bullet(&mut out, "Tip2", &tips.tip2);
        bullet(&mut out, "Tip3", &tips.tip3);
        bullet(&mut out, "Tip4", &tips.tip4);
        close_section(&mut out);
    }

    let prospects = &data.fortune_prospects;
    if [
        &prospects.short_term_outlook,
        &prospects.medium_term_outlook,
        &prospects.long_term_outlook,
    ]
    .iter()
    .any(|outlook| non_empty(outlook).is_some())
    {
        out.push("📈 전망".to_string());
        bullet(&mut out, "단기", &prospects.short_term_outlook);
        bullet(&mut out, "중기", &prospects.medium_term_outlook);
        bullet(&mut out, "장기", &prospects.long_term_outlook);
        close_section(&mut out);
    }

    push_precautions(&mut out, &data.precautions);

    let advice = &data.advice_and_luck;
    if [
        &advice.advice1,
        &advice.advice2,
        &advice.advice3,
        &advice.advice4,
        &advice.advice5,
    ]
    .iter()
    .any(|item| non_empty(item).is_some())
    {
        out.push("💡 조언 & 행운".to_string());
        bullet(&mut out, "1", &advice.advice1);
        bullet(&mut out, "2", &advice.advice2);
        bullet(&mut out, "3", &advice.advice3);
        bullet(&mut out, "4", &advice.advice4);
        bullet(&mut out, "5", &advice.advice5);
        close_section(&mut out);
    }

    if let Some(message) = non_empty(&data.special_message.message_text) {
        out.push("🌟 특별 메시지".to_string());
        out.push(message.to_string());
        close_section(&mut out);
    }

    finish(out, DREAM_EMPTY)
}

fn build_daily_text(data: &DailyFortuneData) -> String {
    let mut out = Vec::new();

    if let Some(summary) = non_empty(&data.overall_summary) {
        out.push("✨ 오늘의 총평".to_string());
        out.push(summary.to_string());
        if let Some(rating) = data.overall_rating.filter(|rating| *rating > 0) {
            let stars = "⭐".repeat(rating.min(5) as usize);
            out.push(format!("(별점: {})", stars));
        }
        close_section(&mut out);
    }

    let wealth = &data.wealth;
    if [
        &wealth.wealth_summary,
        &wealth.wealth_tip1,
        &wealth.wealth_tip2,
        &wealth.lotto_numbers,
    ]
    .iter()
    .any(|item| non_empty(item).is_some())
    {
        out.push("💰 재물운".to_string());
        bullet(&mut out, "요약", &wealth.wealth_summary);
        bullet(&mut out, "Tip1", &wealth.wealth_tip1);
        bullet(&mut out, "Tip2", &wealth.wealth_tip2);
        bullet(&mut out, "로또 번호", &wealth.lotto_numbers);
        close_section(&mut out);
    }

    let love = &data.love;
    if [&love.single, &love.in_relationship, &love.married]
        .iter()
        .any(|item| non_empty(item).is_some())
    {
        out.push("❤️ 연애운".to_string());
        bullet(&mut out, "싱글", &love.single);
        bullet(&mut out, "연인", &love.in_relationship);
        bullet(&mut out, "기혼", &love.married);
        close_section(&mut out);
    }

    push_numbered_tips(&mut out, "💼 커리어", &data.career);
    push_numbered_tips(&mut out, "🩺 건강", &data.health);

    let keywords = &data.keywords;
    if [
        &keywords.lucky_colors,
        &keywords.lucky_numbers,
        &keywords.lucky_times,
        &keywords.lucky_direction,
        &keywords.good_foods,
    ]
    .iter()
    .any(|item| non_empty(item).is_some())
    {
        out.push("🍀 오늘의 행운 포인트".to_string());
        bullet(&mut out, "색상", &keywords.lucky_colors);
        bullet(&mut out, "숫자", &keywords.lucky_numbers);
        bullet(&mut out, "시간", &keywords.lucky_times);
        bullet(&mut out, "방향", &keywords.lucky_direction);
        bullet(&mut out, "음식", &keywords.good_foods);
        close_section(&mut out);
    }

    push_precautions(&mut out, &data.precautions);

    if let Some(advice) = non_empty(&data.advice.advice_text) {
        out.push("💡 오늘의 조언".to_string());
        out.push(advice.to_string());
        close_section(&mut out);
    }

    if let Some(preview) = non_empty(&data.tomorrow_preview) {
        out.push("🔮 내일 미리보기".to_string());
        out.push(preview.to_string());
        close_section(&mut out);
    }

    finish(out, DAILY_EMPTY)
}

fn build_life_text(data: &LifeFortuneData) -> String {
    let mut out = Vec::new();

    let personality = &data.personality;
    if [
        &personality.strength,
        &personality.talent,
        &personality.responsibility,
        &personality.empathy,
    ]
    .iter()
    .any(|item| non_empty(item).is_some())
    {
        out.push("🧭 성향·성격".to_string());
        bullet(&mut out, "장점", &personality.strength);
        bullet(&mut out, "재능", &personality.talent);
        bullet(&mut out, "책임감", &personality.responsibility);
        bullet(&mut out, "공감 능력", &personality.empathy);
        close_section(&mut out);
    }

    let wealth = &data.wealth;
    if [
        &wealth.twenties,
        &wealth.thirties,
        &wealth.forties,
        &wealth.fifties_and_beyond,
    ]
    .iter()
    .any(|item| non_empty(item).is_some())
    {
        out.push("💰 재물운".to_string());
        bullet(&mut out, "20대", &wealth.twenties);
        bullet(&mut out, "30대", &wealth.thirties);
        bullet(&mut out, "40대", &wealth.forties);
        bullet(&mut out, "50대 이후", &wealth.fifties_and_beyond);
        close_section(&mut out);
    }

    let love = &data.love_and_marriage;
    if [
        &love.first_love,
        &love.marriage_age,
        &love.spouse_meeting,
        &love.married_life,
    ]
    .iter()
    .any(|item| non_empty(item).is_some())
    {
        out.push("❤️ 연애·결혼운".to_string());
        bullet(&mut out, "첫사랑", &love.first_love);
        bullet(&mut out, "결혼 시기", &love.marriage_age);
        bullet(&mut out, "배우자 만남", &love.spouse_meeting);
        bullet(&mut out, "결혼 생활", &love.married_life);
        close_section(&mut out);
    }

    let career = &data.career;
    if [
        &career.successful_fields,
        &career.career_change_age,
        &career.leadership_style,
        &career.entrepreneurship,
    ]
    .iter()
    .any(|item| non_empty(item).is_some())
    {
        out.push("🏆 직업·커리어".to_string());
        bullet(&mut out, "적합 분야", &career.successful_fields);
        bullet(&mut out, "전환 시기", &career.career_change_age);
        bullet(&mut out, "리더십 스타일", &career.leadership_style);
        bullet(&mut out, "창업 기질", &career.entrepreneurship);
        close_section(&mut out);
    }

    let health = &data.health;
    if [
        &health.general_health,
        &health.weak_point,
        &health.checkup_reminder,
        &health.recommended_exercise,
    ]
    .iter()
    .any(|item| non_empty(item).is_some())
    {
        out.push("🩺 건강운".to_string());
        bullet(&mut out, "종합", &health.general_health);
        bullet(&mut out, "약점", &health.weak_point);
        bullet(&mut out, "점검 포인트", &health.checkup_reminder);
        bullet(&mut out, "추천 운동", &health.recommended_exercise);
        close_section(&mut out);
    }

    let turning = &data.turning_points;
    if [&turning.ein, &turning.zwei, &turning.drei]
        .iter()
        .any(|item| non_empty(item).is_some())
    {
        out.push("🔀 전환점".to_string());
        bullet(&mut out, "1차", &turning.ein);
        bullet(&mut out, "2차", &turning.zwei);
        bullet(&mut out, "3차", &turning.drei);
        close_section(&mut out);
    }

    let luck = &data.good_luck;
    if [
        &luck.lucky_colors,
        &luck.lucky_numbers,
        &luck.lucky_direction,
        &luck.good_days,
        &luck.avoidances,
    ]
    .iter()
    .any(|item| non_empty(item).is_some())
    {
        out.push("🍀 행운 포인트".to_string());
        bullet(&mut out, "행운의 색", &luck.lucky_colors);
        bullet(&mut out, "행운의 숫자", &luck.lucky_numbers);
        bullet(&mut out, "행운의 방향", &luck.lucky_direction);
        bullet(&mut out, "좋은 요일", &luck.good_days);
        bullet(&mut out, "피해야 할 것", &luck.avoidances);
        close_section(&mut out);
    }

    finish(out, LIFE_EMPTY)
}

fn push_precautions(out: &mut Vec<String>, precautions: &Precautions) {
    if [
        &precautions.precaution1,
        &precautions.precaution2,
        &precautions.precaution3,
        &precautions.precaution4,
    ]
    .iter()
    .any(|item| non_empty(item).is_some())
    {
        out.push("⚠️ 주의사항".to_string());
        bullet(out, "1", &precautions.precaution1);
        bullet(out, "2", &precautions.precaution2);
        bullet(out, "3", &precautions.precaution3);
        bullet(out, "4", &precautions.precaution4);
        close_section(out);
    }
}

fn push_numbered_tips(out: &mut Vec<String>, title: &str, tips: &NumberedTips) {
    if [&tips.tip1, &tips.tip2, &tips.tip3, &tips.tip4]
        .iter()
        .any(|tip| non_empty(tip).is_some())
    {
        out.push(title.to_string());
        bullet(out, "Tip1", &tips.tip1);
        bullet(out, "Tip2", &tips.tip2);
        bullet(out, "Tip3", &tips.tip3);
        bullet(out, "Tip4", &tips.tip4);
        close_section(out);
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// History merge
// ─────────────────────────────────────────────────────────────────────────────

/// Merge server-hydrated history into the session's local results.
///
/// De-duplicates by result id. For a shared id the server copy wins, except
/// that an empty server `content` (detail fetch failed) keeps whatever text
/// the local copy already had. Locally-only results survive; server-only
/// results append in server order. Applying the same hydration twice is a
/// no-op beyond the first application.
pub fn merge_history(
    existing: &[FortuneResult],
    hydrated: &[FortuneResult],
) -> Vec<FortuneResult> {
    let hydrated_by_id: HashMap<&str, &FortuneResult> = hydrated
        .iter()
        .map(|result| (result.id.as_str(), result))
        .collect();

    let mut merged = Vec::with_capacity(existing.len() + hydrated.len());
    let mut seen: HashSet<&str> = HashSet::with_capacity(existing.len());

    for local in existing {
        seen.insert(local.id.as_str());
        match hydrated_by_id.get(local.id.as_str()) {
            Some(server) => {
                let mut replacement = (*server).clone();
                if replacement.content.is_empty() {
                    replacement.content = local.content.clone();
                }
                merged.push(replacement);
            }
            None => merged.push(local.clone()),
        }
    }

    for server in hydrated {
        if !seen.contains(server.id.as_str()) {
            merged.push(server.clone());
        }
    }

    merged
}
