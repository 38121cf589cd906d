//! Publication type tags and their priority order.

/// Document type, tagged the way open-archive records tag them.
///
/// When two records for the same work disagree, the tag with the higher
/// priority wins: a record typed as a journal article outranks one typed
/// as a preprint note or an undefined leftover.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PubType {
    Art,
    Couv,
    Douv,
    Ouv,
    These,
    Hdr,
    Mem,
    Comm,
    Report,
    Patent,
    Minutes,
    Synthese,
    Lecture,
    Note,
    Poster,
    OtherReport,
    Son,
    Map,
    PresConf,
    Other,
    Img,
    Video,
    Undefined,
}

impl PubType {
    pub fn parse(tag: &str) -> PubType {
        match tag.to_uppercase().as_str() {
            "ART" => PubType::Art,
            "COUV" => PubType::Couv,
            "DOUV" => PubType::Douv,
            "OUV" => PubType::Ouv,
            "THESE" => PubType::These,
            "HDR" => PubType::Hdr,
            "MEM" => PubType::Mem,
            "COMM" => PubType::Comm,
            "REPORT" => PubType::Report,
            "PATENT" => PubType::Patent,
            "MINUTES" => PubType::Minutes,
            "SYNTHESE" => PubType::Synthese,
            "LECTURE" => PubType::Lecture,
            "NOTE" => PubType::Note,
            "POSTER" => PubType::Poster,
            "OTHERREPORT" => PubType::OtherReport,
            "SON" => PubType::Son,
            "MAP" => PubType::Map,
            "PRESCONF" => PubType::PresConf,
            "OTHER" => PubType::Other,
            "IMG" => PubType::Img,
            "VIDEO" => PubType::Video,
            _ => PubType::Undefined,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PubType::Art => "ART",
            PubType::Couv => "COUV",
            PubType::Douv => "DOUV",
            PubType::Ouv => "OUV",
            PubType::These => "THESE",
            PubType::Hdr => "HDR",
            PubType::Mem => "MEM",
            PubType::Comm => "COMM",
            PubType::Report => "REPORT",
            PubType::Patent => "PATENT",
            PubType::Minutes => "MINUTES",
            PubType::Synthese => "SYNTHESE",
            PubType::Lecture => "LECTURE",
            PubType::Note => "NOTE",
            PubType::Poster => "POSTER",
            PubType::OtherReport => "OTHERREPORT",
            PubType::Son => "SON",
            PubType::Map => "MAP",
            PubType::PresConf => "PRESCONF",
            PubType::Other => "OTHER",
            PubType::Img => "IMG",
            PubType::Video => "VIDEO",
            PubType::Undefined => "UNDEFINED",
        }
    }

    pub fn priority(self) -> u8 {
        match self {
            PubType::Art => 100,
            PubType::Douv => 77,
            PubType::Couv => 76,
            PubType::Ouv | PubType::These | PubType::Hdr | PubType::Mem => 75,
            PubType::Comm => 50,
            PubType::Report => 25,
            PubType::Patent | PubType::Minutes => 15,
            PubType::Synthese => 13,
            PubType::Lecture => 12,
            PubType::Note => 11,
            PubType::Poster => 10,
            PubType::Son | PubType::Map => 7,
            PubType::OtherReport | PubType::PresConf => 6,
            PubType::Other => 5,
            PubType::Img | PubType::Video => 4,
            PubType::Undefined => 0,
        }
    }

    /// Replace `self` when `other` outranks it. Never demotes.
    pub fn promote(&mut self, other: PubType) {
        if other.priority() > self.priority() {
            *self = other;
        }
    }
}

impl std::fmt::Display for PubType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
