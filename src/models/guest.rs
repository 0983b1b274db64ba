use chrono::NaiveDateTime;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

pub type GuestId = i64;

/// День спектакля. В хранилище дни пишутся по-голландски, как в исходной анкете.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Day {
    #[serde(rename = "woensdag", alias = "wednesday")]
    Wednesday,
    #[serde(rename = "donderdag", alias = "thursday")]
    Thursday,
    #[serde(rename = "vrijdag", alias = "friday")]
    Friday,
}

impl Day {
    pub const ALL: [Day; 3] = [Day::Wednesday, Day::Thursday, Day::Friday];

    /// Последний день по календарю (для особого порога исполнителей)
    pub fn last() -> Day {
        Day::Friday
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Day::Wednesday => "woensdag",
            Day::Thursday => "donderdag",
            Day::Friday => "vrijdag",
        }
    }
}

impl fmt::Display for Day {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown day `{0}`")]
pub struct UnknownDay(pub String);

impl FromStr for Day {
    type Err = UnknownDay;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "woensdag" | "wednesday" => Ok(Day::Wednesday),
            "donderdag" | "thursday" => Ok(Day::Thursday),
            "vrijdag" | "friday" => Ok(Day::Friday),
            other => Err(UnknownDay(other.to_string())),
        }
    }
}

/// Насколько день подходит гостю
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DayRank {
    First,
    Second,
    Other,
}

/// Категория гостя. Порядок вариантов = порядок обработки.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Honoree,
    Performer,
    Teacher,
    Regular,
}

impl Tier {
    pub fn is_priority(&self) -> bool {
        !matches!(self, Tier::Regular)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Guest {
    pub id: GuestId,
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub student_number: Option<i64>,
    #[serde(default)]
    pub email: Option<String>,
    pub tickets: u32,
    pub first_day: Day,
    #[serde(default, deserialize_with = "optional_day")]
    pub second_day: Option<Day>,
    /// Номер студента, рядом с которым гость хочет сидеть
    #[serde(default)]
    pub preferred_student: Option<String>,
    /// Email-ы коллег через запятую (только для преподавателей)
    #[serde(default)]
    pub preferred_emails: Option<String>,
    #[serde(default)]
    pub is_honoree: bool,
    #[serde(default)]
    pub is_teacher: bool,
    #[serde(default)]
    pub is_performer: bool,
    #[serde(default)]
    pub is_member: bool,
    pub registered_at: NaiveDateTime,
}

// Пустая строка во втором дне означает "нет второго дня"
fn optional_day<'de, D>(deserializer: D) -> Result<Option<Day>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(s) => s.parse().map(Some).map_err(serde::de::Error::custom),
    }
}

impl Guest {
    pub fn new(
        id: GuestId,
        first_name: impl Into<String>,
        last_name: impl Into<String>,
        tickets: u32,
        first_day: Day,
        registered_at: NaiveDateTime,
    ) -> Self {
        Self {
            id,
            first_name: first_name.into(),
            last_name: last_name.into(),
            student_number: None,
            email: None,
            tickets,
            first_day,
            second_day: None,
            preferred_student: None,
            preferred_emails: None,
            is_honoree: false,
            is_teacher: false,
            is_performer: false,
            is_member: false,
            registered_at,
        }
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    /// Категория считается один раз по флагам: Honoree > Performer > Teacher > Regular
    pub fn tier(&self) -> Tier {
        if self.is_honoree {
            Tier::Honoree
        } else if self.is_performer {
            Tier::Performer
        } else if self.is_teacher {
            Tier::Teacher
        } else {
            Tier::Regular
        }
    }

    pub fn is_vip(&self) -> bool {
        self.tier().is_priority()
    }

    pub fn day_rank(&self, day: Day) -> DayRank {
        if self.first_day == day {
            DayRank::First
        } else if self.second_day == Some(day) {
            DayRank::Second
        } else {
            DayRank::Other
        }
    }

    pub fn prefers(&self, day: Day) -> bool {
        self.day_rank(day) != DayRank::Other
    }

    pub fn preferred_days(&self) -> impl Iterator<Item = Day> + '_ {
        std::iter::once(self.first_day).chain(self.second_day)
    }

    /// Общий день: сначала совпадение первого выбора, потом любое пересечение
    pub fn shares_day_with(&self, other: &Guest) -> bool {
        self.first_day == other.first_day
            || self.preferred_days().any(|d| other.prefers(d))
    }

    pub fn normalized_email(&self) -> Option<String> {
        self.email
            .as_deref()
            .map(|e| e.trim().to_lowercase())
            .filter(|e| !e.is_empty())
    }

    pub fn preferred_email_list(&self) -> Vec<String> {
        self.preferred_emails
            .as_deref()
            .unwrap_or_default()
            .split(',')
            .map(|e| e.trim().to_lowercase())
            .filter(|e| !e.is_empty())
            .collect()
    }

    pub fn preferred_student_number(&self) -> Option<i64> {
        self.preferred_student
            .as_deref()
            .and_then(|s| s.trim().parse().ok())
    }

    /// Есть ли у гостя заполненное поле предпочтения (без учёта того, нашлось ли совпадение)
    pub fn has_raw_preference(&self) -> bool {
        let field = if self.is_teacher {
            self.preferred_emails.as_deref()
        } else {
            self.preferred_student.as_deref()
        };
        field.map(|s| !s.trim().is_empty()).unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(h: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 1)
            .and_then(|d| d.and_hms_opt(h, 0, 0))
            .unwrap()
    }

    #[test]
    fn tier_precedence_follows_flags() {
        let mut g = Guest::new(1, "Anna", "de Vries", 2, Day::Wednesday, at(9));
        assert_eq!(g.tier(), Tier::Regular);
        g.is_teacher = true;
        g.is_performer = true;
        assert_eq!(g.tier(), Tier::Performer);
        g.is_honoree = true;
        assert_eq!(g.tier(), Tier::Honoree);
        assert!(g.is_vip());
    }

    #[test]
    fn empty_second_day_deserializes_as_none() {
        let json = r#"{
            "id": 7, "firstName": "Piet", "lastName": "Jansen", "tickets": 3,
            "firstDay": "donderdag", "secondDay": "", "registeredAt": "2024-03-01T10:00:00"
        }"#;
        let guest: Guest = serde_json::from_str(json).unwrap();
        assert_eq!(guest.first_day, Day::Thursday);
        assert_eq!(guest.second_day, None);
    }

    #[test]
    fn day_parsing_is_case_insensitive() {
        assert_eq!(" Vrijdag ".parse::<Day>().unwrap(), Day::Friday);
        assert!("zaterdag".parse::<Day>().is_err());
    }

    #[test]
    fn shares_day_checks_first_then_overlap() {
        let mut a = Guest::new(1, "A", "A", 1, Day::Wednesday, at(9));
        let mut b = Guest::new(2, "B", "B", 1, Day::Thursday, at(9));
        assert!(!a.shares_day_with(&b));
        b.second_day = Some(Day::Wednesday);
        assert!(a.shares_day_with(&b));
        a.first_day = Day::Friday;
        a.second_day = Some(Day::Thursday);
        assert!(a.shares_day_with(&b));
    }

    #[test]
    fn preferred_emails_are_normalized() {
        let mut g = Guest::new(1, "T", "T", 1, Day::Wednesday, at(9));
        g.is_teacher = true;
        g.preferred_emails = Some(" Jan@School.nl, ,kees@school.nl ".into());
        assert_eq!(g.preferred_email_list(), vec!["jan@school.nl", "kees@school.nl"]);
        assert!(g.has_raw_preference());
    }
}
