//! Record kinds and their field tables
//!
//! A kind fixes everything that differs between author and publication
//! harvests: endpoint, query field, identifier tag, the ordered fields that
//! make up a CSV row and the detail tables produced along the way.

use std::fmt;

/// Cell formatting applied to single values
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldFormat {
    Plain,
    /// 8-character ISSN printed as `1234-5678`
    Issn,
}

/// Sub-field scanned inside each value of a detail field
#[derive(Debug, Clone, Copy)]
pub struct SubField {
    pub name: &'static str,
    pub start: &'static str,
    pub end: &'static str,
}

/// One column of the main CSV, after the identifier column
#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    /// Header text
    pub column: &'static str,
    /// Name used in placeholders and log lines
    pub name: &'static str,
    pub start: &'static str,
    pub end: &'static str,
    pub format: FieldFormat,
    /// Record identifiers lacking this field in `#{ids}_with_no_{name}.txt`
    pub track_missing: bool,
    /// Expanded into detail rows through sub-tags
    pub detail: Option<DetailTable>,
    /// Label appended to detail rows (e.g. `Preferred`)
    pub label: Option<&'static str>,
}

impl FieldSpec {
    const fn plain(column: &'static str, start: &'static str, end: &'static str) -> Self {
        Self {
            column,
            name: column,
            start,
            end,
            format: FieldFormat::Plain,
            track_missing: false,
            detail: None,
            label: None,
        }
    }

    const fn named(mut self, name: &'static str) -> Self {
        self.name = name;
        self
    }

    const fn issn(mut self) -> Self {
        self.format = FieldFormat::Issn;
        self
    }

    const fn tracked(mut self) -> Self {
        self.track_missing = true;
        self
    }

    const fn detail(mut self, table: DetailTable, label: Option<&'static str>) -> Self {
        self.detail = Some(table);
        self.label = label;
        self
    }

    /// Cell text when the response has no value for this field
    pub fn placeholder(&self) -> String {
        placeholder(self.name)
    }
}

pub fn placeholder(name: &str) -> String {
    format!("no {name} data available")
}

/// Secondary CSV tables holding one row per repeated sub-record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DetailTable {
    NameVariants,
    PublicationAuthors,
    PublicationAffiliations,
    /// One row per author and affiliation ID, split out of the author table
    AuthorAffiliationPairs,
}

const NAME_PARTS: &[SubField] = &[
    SubField {
        name: "AuthorSurname",
        start: "<surname>",
        end: "</surname>",
    },
    SubField {
        name: "AuthorGivenName",
        start: "<given-name>",
        end: "</given-name>",
    },
    SubField {
        name: "AuthorInitials",
        start: "<initials>",
        end: "</initials>",
    },
];

const PUB_AUTHOR_PARTS: &[SubField] = &[
    SubField {
        name: "AuthName",
        start: "<authname>",
        end: "</authname>",
    },
    SubField {
        name: "AuthorID",
        start: "<authid>",
        end: "</authid>",
    },
    SubField {
        name: "AuthORCID",
        start: "<orcid>",
        end: "</orcid>",
    },
    SubField {
        name: "AuthorAffIDList",
        start: "<afid>",
        end: "</afid>",
    },
    SubField {
        name: "AuthorURL",
        start: "<author-url>",
        end: "</author-url>",
    },
];

const AFFILIATION_PARTS: &[SubField] = &[
    SubField {
        name: "AfilliationName",
        start: "<affilname>",
        end: "</affilname>",
    },
    SubField {
        name: "AfilliationID",
        start: "<afid>",
        end: "</afid>",
    },
    SubField {
        name: "AfilliationCity",
        start: "<affiliation-city>",
        end: "</affiliation-city>",
    },
    SubField {
        name: "AfilliationCountry",
        start: "<affiliation-country>",
        end: "</affiliation-country>",
    },
    SubField {
        name: "AfilliationURL",
        start: "<affiliation-url>",
        end: "</affiliation-url>",
    },
];

impl DetailTable {
    /// Sub-tags scanned for the table; empty for derived tables
    pub fn sub_fields(self) -> &'static [SubField] {
        match self {
            Self::NameVariants => NAME_PARTS,
            Self::PublicationAuthors => PUB_AUTHOR_PARTS,
            Self::PublicationAffiliations => AFFILIATION_PARTS,
            Self::AuthorAffiliationPairs => &[],
        }
    }

    pub fn file_name(self) -> &'static str {
        match self {
            Self::NameVariants => "author_name_variants.csv",
            Self::PublicationAuthors => "publication_authors.csv",
            Self::PublicationAffiliations => "publication_affiliations.csv",
            Self::AuthorAffiliationPairs => "publication_author_affiliations.csv",
        }
    }

    pub fn header(self) -> Vec<&'static str> {
        let mut header = match self {
            Self::NameVariants => vec!["AuthID"],
            Self::PublicationAuthors | Self::PublicationAffiliations => vec!["EID"],
            Self::AuthorAffiliationPairs => return vec!["EID", "AuthorID", "AfilliationID"],
        };
        header.extend(self.sub_fields().iter().map(|s| s.name));
        if self == Self::NameVariants {
            header.push("AuthorNameType");
        }
        header
    }
}

impl fmt::Display for DetailTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::NameVariants => "name variants",
            Self::PublicationAuthors => "authors",
            Self::PublicationAffiliations => "affiliations",
            Self::AuthorAffiliationPairs => "author affiliations",
        };
        f.write_str(name)
    }
}

const AUTHOR_FIELDS: &[FieldSpec] = &[
    FieldSpec::plain("AuthorPreferredName (ignore)", "<preferred-name>", "</preferred-name>")
        .named("AuthorPreferredName")
        .tracked()
        .detail(DetailTable::NameVariants, Some("Preferred")),
    FieldSpec::plain("AuthORCID", "<orcid>", "</orcid>")
        .named("AuthorORCID")
        .tracked(),
    FieldSpec::plain("CurrentAffiliation", "<affiliation-name>", "</affiliation-name>").tracked(),
    FieldSpec::plain("AuthorNameVariantList (ignore)", "<name-variant>", "</name-variant>")
        .named("AuthorNameVariantList")
        .tracked()
        .detail(DetailTable::NameVariants, Some("Variant")),
];

const PUBLICATION_FIELDS: &[FieldSpec] = &[
    FieldSpec::plain("PubDOI", "<prism:doi>", "</prism:doi>"),
    FieldSpec::plain("PubORCID", "<orcid>", "</orcid>"),
    FieldSpec::plain("PubmedID", "<pubmed-id>", "</pubmed-id>"),
    FieldSpec::plain("PubTitle", "<dc:title>", "</dc:title>"),
    FieldSpec::plain("PubDate", "<prism:coverDate>", "</prism:coverDate>"),
    FieldSpec::plain("Abstract", "<dc:description>", "</dc:description>"),
    FieldSpec::plain("AuthorKeywords", "<authkeywords>", "</authkeywords>"),
    FieldSpec::plain("FirstAuthor", "<dc:creator>", "</dc:creator>"),
    FieldSpec::plain("TotalAuthors", "<author-count limit=\"100\" total=", "</author-count>"),
    FieldSpec::plain(
        "SourceTitle(JournalName)",
        "<prism:publicationName>",
        "</prism:publicationName>",
    ),
    FieldSpec::plain("PubISSN", "<prism:issn>", "</prism:issn>").issn(),
    FieldSpec::plain("Pub_eISSN", "<prism:eIssn>", "</prism:eIssn>").issn(),
    FieldSpec::plain("PubISBN", "<prism:isbn>", "</prism:isbn>"),
    FieldSpec::plain("Volume", "<prism:volume>", "</prism:volume>"),
    FieldSpec::plain("Issue", "<prism:issueIdentifier>", "</prism:issueIdentifier>"),
    FieldSpec::plain("PageRange", "<prism:pageRange>", "</prism:pageRange>"),
    FieldSpec::plain("DocumentType1", "<prism:aggregationType>", "</prism:aggregationType>"),
    FieldSpec::plain("DocumentType2", "<subtypeDescription>", "</subtypeDescription>"),
    FieldSpec::plain("Count_of_citing_documents", "<citedby-count>", "</citedby-count>"),
    FieldSpec::plain("AuthorList", "<author seq=", "</author>")
        .tracked()
        .detail(DetailTable::PublicationAuthors, None),
    FieldSpec::plain("AffiliationList", "<affiliation>", "</affiliation>")
        .tracked()
        .detail(DetailTable::PublicationAffiliations, None),
    FieldSpec::plain("FunderSponsorList", "<fund-sponsor>", "</fund-sponsor>"),
];

/// What a harvest run collects
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordKind {
    /// Scopus author profiles, keyed by author ID
    Authors,
    /// Scopus documents, keyed by EID
    Publications,
}

impl RecordKind {
    pub const ALL: [RecordKind; 2] = [Self::Authors, Self::Publications];

    /// Search endpoint under the API base URL
    pub fn endpoint(self) -> &'static str {
        match self {
            Self::Authors => "author",
            Self::Publications => "scopus",
        }
    }

    /// Search field the identifiers are matched against
    pub fn query_field(self) -> &'static str {
        match self {
            Self::Authors => "au-id",
            Self::Publications => "eid",
        }
    }

    /// Response view requested with the query, if any
    pub fn view(self) -> Option<&'static str> {
        match self {
            Self::Authors => None,
            Self::Publications => Some("COMPLETE"),
        }
    }

    /// Tag pair holding the record identifier inside an entry
    pub fn id_tags(self) -> (&'static str, &'static str) {
        match self {
            Self::Authors => ("<dc:identifier>", "</dc:identifier>"),
            Self::Publications => ("<eid>", "</eid>"),
        }
    }

    /// Prefix stripped from the identifier value
    pub fn id_prefix(self) -> &'static str {
        match self {
            Self::Authors => "AUTHOR_ID:",
            Self::Publications => "",
        }
    }

    pub fn id_column(self) -> &'static str {
        match self {
            Self::Authors => "AuthID",
            Self::Publications => "PubEID",
        }
    }

    /// Plural identifier noun used in per-field id lists
    pub fn id_plural(self) -> &'static str {
        match self {
            Self::Authors => "AuthIDs",
            Self::Publications => "EIDs",
        }
    }

    pub fn fields(self) -> &'static [FieldSpec] {
        match self {
            Self::Authors => AUTHOR_FIELDS,
            Self::Publications => PUBLICATION_FIELDS,
        }
    }

    /// Main CSV header: identifier column followed by the field columns
    pub fn header(self) -> Vec<&'static str> {
        let mut header = vec![self.id_column()];
        header.extend(self.fields().iter().map(|f| f.column));
        header
    }

    pub fn detail_tables(self) -> &'static [DetailTable] {
        match self {
            Self::Authors => &[DetailTable::NameVariants],
            Self::Publications => &[
                DetailTable::PublicationAuthors,
                DetailTable::PublicationAffiliations,
                DetailTable::AuthorAffiliationPairs,
            ],
        }
    }

    /// Stem of the main CSV file name
    pub fn file_stem(self) -> &'static str {
        match self {
            Self::Authors => "AuthorRecords",
            Self::Publications => "PublicationRecords",
        }
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Authors => f.write_str("authors"),
            Self::Publications => f.write_str("publications"),
        }
    }
}

impl std::str::FromStr for RecordKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "authors" | "author" | "authid" => Ok(Self::Authors),
            "publications" | "publication" | "eid" | "eids" => Ok(Self::Publications),
            other => Err(format!(
                "unknown record kind '{other}' (expected authors or publications)"
            )),
        }
    }
}
