use std::fmt;

/// Gender classes in network output order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Gender {
    Male,
    Female,
}

impl Gender {
    pub const ALL: [Gender; 2] = [Gender::Male, Gender::Female];

    pub fn label(self) -> &'static str {
        match self {
            Gender::Male => "Male",
            Gender::Female => "Female",
        }
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }
}

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// The eight age ranges the age network distinguishes, youngest first.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum AgeBucket {
    Infant,
    EarlyChild,
    Child,
    Teen,
    YoungAdult,
    Adult,
    MiddleAged,
    Senior,
}

impl AgeBucket {
    pub const ALL: [AgeBucket; 8] = [
        AgeBucket::Infant,
        AgeBucket::EarlyChild,
        AgeBucket::Child,
        AgeBucket::Teen,
        AgeBucket::YoungAdult,
        AgeBucket::Adult,
        AgeBucket::MiddleAged,
        AgeBucket::Senior,
    ];

    pub fn label(self) -> &'static str {
        match self {
            AgeBucket::Infant => "(0-2)",
            AgeBucket::EarlyChild => "(4-6)",
            AgeBucket::Child => "(8-12)",
            AgeBucket::Teen => "(15-20)",
            AgeBucket::YoungAdult => "(25-32)",
            AgeBucket::Adult => "(38-43)",
            AgeBucket::MiddleAged => "(48-53)",
            AgeBucket::Senior => "(60-100)",
        }
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }
}

impl fmt::Display for AgeBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Gender and age bucket for one face.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct DetectionResult {
    pub gender: Gender,
    pub age: AgeBucket,
}

impl fmt::Display for DetectionResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}, {}", self.gender, self.age)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_age_labels_in_model_order() {
        let labels: Vec<&str> = AgeBucket::ALL.iter().map(|a| a.label()).collect();
        assert_eq!(
            labels,
            vec!["(0-2)", "(4-6)", "(8-12)", "(15-20)", "(25-32)", "(38-43)", "(48-53)", "(60-100)"]
        );
    }

    #[test]
    fn test_age_buckets_are_ordinal() {
        assert!(AgeBucket::Infant < AgeBucket::Teen);
        assert!(AgeBucket::MiddleAged < AgeBucket::Senior);
    }

    #[rstest]
    #[case(0, Some(Gender::Male))]
    #[case(1, Some(Gender::Female))]
    #[case(2, None)]
    fn test_gender_from_index(#[case] index: usize, #[case] expected: Option<Gender>) {
        assert_eq!(Gender::from_index(index), expected);
    }

    #[rstest]
    #[case(0, Some(AgeBucket::Infant))]
    #[case(4, Some(AgeBucket::YoungAdult))]
    #[case(7, Some(AgeBucket::Senior))]
    #[case(8, None)]
    fn test_age_from_index(#[case] index: usize, #[case] expected: Option<AgeBucket>) {
        assert_eq!(AgeBucket::from_index(index), expected);
    }

    #[test]
    fn test_result_text() {
        let result = DetectionResult {
            gender: Gender::Female,
            age: AgeBucket::YoungAdult,
        };
        assert_eq!(result.to_string(), "Female, (25-32)");
    }
}
