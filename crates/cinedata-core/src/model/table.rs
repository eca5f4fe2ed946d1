use serde::{Deserialize, Serialize};
use std::fmt;

/// A table populated directly from one IMDb dataset file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BaseTable {
    /// People (`name.basics`).
    NameBasics,
    /// Alternative titles per title (`title.akas`).
    TitleAkas,
    /// Titles (`title.basics`).
    TitleBasics,
    /// Directors and writers per title (`title.crew`).
    TitleCrew,
    /// Episode to parent series links (`title.episode`).
    TitleEpisode,
    /// Credits linking titles to people (`title.principals`).
    TitlePrincipals,
    /// Average rating and vote count per title (`title.ratings`).
    TitleRatings,
}

impl BaseTable {
    pub const ALL: [Self; 7] = [
        Self::NameBasics,
        Self::TitleAkas,
        Self::TitleBasics,
        Self::TitleCrew,
        Self::TitleEpisode,
        Self::TitlePrincipals,
        Self::TitleRatings,
    ];

    /// The store table name.
    #[must_use]
    pub const fn table_name(self) -> &'static str {
        match self {
            Self::NameBasics => "name_basics",
            Self::TitleAkas => "title_akas",
            Self::TitleBasics => "title_basics",
            Self::TitleCrew => "title_crew",
            Self::TitleEpisode => "title_episode",
            Self::TitlePrincipals => "title_principals",
            Self::TitleRatings => "title_ratings",
        }
    }

    /// The published resource this table is loaded from.
    #[must_use]
    pub const fn resource(self) -> &'static str {
        match self {
            Self::NameBasics => "name.basics.tsv.gz",
            Self::TitleAkas => "title.akas.tsv.gz",
            Self::TitleBasics => "title.basics.tsv.gz",
            Self::TitleCrew => "title.crew.tsv.gz",
            Self::TitleEpisode => "title.episode.tsv.gz",
            Self::TitlePrincipals => "title.principals.tsv.gz",
            Self::TitleRatings => "title.ratings.tsv.gz",
        }
    }

    /// Base tables the analytics stage joins over.
    #[must_use]
    pub const fn is_joined(self) -> bool {
        matches!(
            self,
            Self::TitleBasics | Self::TitlePrincipals | Self::TitleRatings
        )
    }
}

impl fmt::Display for BaseTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.table_name())
    }
}

/// A table computed from base tables and rebuilt on every run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DerivedTable {
    /// One row per title with rating and distinct participant count.
    TitleAnalytics,
    /// One row per credit with the title's genres.
    ParticipantsAnalytics,
}

impl DerivedTable {
    pub const ALL: [Self; 2] = [Self::TitleAnalytics, Self::ParticipantsAnalytics];

    #[must_use]
    pub const fn table_name(self) -> &'static str {
        match self {
            Self::TitleAnalytics => "title_analytics",
            Self::ParticipantsAnalytics => "participants_analytics",
        }
    }
}

impl fmt::Display for DerivedTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.table_name())
    }
}
