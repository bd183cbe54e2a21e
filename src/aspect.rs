use serde::Serialize;
use std::fmt;

const RATIO_16_9: f64 = 16.0 / 9.0;
const RATIO_9_16: f64 = 9.0 / 16.0;
const TOLERANCE: f64 = 0.1;

/// Orientation bucket used as the namespace prefix of stored video objects.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    Landscape,
    Portrait,
    Other,
}

impl Orientation {
    pub fn as_str(self) -> &'static str {
        match self {
            Orientation::Landscape => "landscape",
            Orientation::Portrait => "portrait",
            Orientation::Other => "other",
        }
    }
}

impl fmt::Display for Orientation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classify stream geometry by its width/height ratio.
///
/// Landscape is checked before portrait. `height` must be non-zero; the
/// prober rejects zero-height streams before classification.
pub fn classify(width: u32, height: u32) -> Orientation {
    let ratio = f64::from(width) / f64::from(height);

    if (ratio - RATIO_16_9).abs() <= TOLERANCE {
        Orientation::Landscape
    } else if (ratio - RATIO_9_16).abs() <= TOLERANCE {
        Orientation::Portrait
    } else {
        Orientation::Other
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn common_geometries() {
        assert_eq!(classify(16, 9), Orientation::Landscape);
        assert_eq!(classify(9, 16), Orientation::Portrait);
        assert_eq!(classify(1, 1), Orientation::Other);
        assert_eq!(classify(1920, 1080), Orientation::Landscape);
        assert_eq!(classify(1080, 1920), Orientation::Portrait);
        assert_eq!(classify(1280, 720), Orientation::Landscape);
        assert_eq!(classify(720, 1280), Orientation::Portrait);
    }

    #[test]
    fn near_ratios_fall_inside_tolerance() {
        // 1.85:1 cinema crop is within 0.1 of 16:9
        assert_eq!(classify(1998, 1080), Orientation::Landscape);
        // 4:3 is too far from either bucket
        assert_eq!(classify(640, 480), Orientation::Other);
        assert_eq!(classify(480, 640), Orientation::Other);
        // 21:9 ultrawide
        assert_eq!(classify(2560, 1080), Orientation::Other);
    }

    #[test]
    fn depends_only_on_ratio() {
        for scale in [1, 2, 3, 10, 120] {
            assert_eq!(classify(16 * scale, 9 * scale), Orientation::Landscape);
            assert_eq!(classify(9 * scale, 16 * scale), Orientation::Portrait);
            assert_eq!(classify(scale, scale), Orientation::Other);
        }
    }

    #[test]
    fn labels() {
        assert_eq!(Orientation::Landscape.to_string(), "landscape");
        assert_eq!(Orientation::Portrait.as_str(), "portrait");
        assert_eq!(Orientation::Other.to_string(), "other");
    }
}
