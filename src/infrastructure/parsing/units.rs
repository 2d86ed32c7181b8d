//! Weight and length units

pub const KG_PER_POUND: f64 = 0.453_592;
pub const KG_PER_OUNCE: f64 = 0.028_349_5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WeightUnit {
    Gram,
    Kilogram,
    Pound,
    Ounce,
}

impl WeightUnit {
    /// Parse a unit token as written on product pages (`g`, `Kilograms`, `lbs`, `oz.`)
    pub fn parse(token: &str) -> Option<Self> {
        match token.trim().trim_end_matches('.').to_lowercase().as_str() {
            "g" | "gr" | "gram" | "grams" | "gramme" | "grammes" => Some(Self::Gram),
            "kg" | "kgs" | "kilo" | "kilos" | "kilogram" | "kilograms" | "kilogramme" | "kilogrammes" => {
                Some(Self::Kilogram)
            }
            "lb" | "lbs" | "pound" | "pounds" => Some(Self::Pound),
            "oz" | "ounce" | "ounces" => Some(Self::Ounce),
            _ => None,
        }
    }

    pub fn kg_factor(self) -> f64 {
        match self {
            Self::Gram => 0.001,
            Self::Kilogram => 1.0,
            Self::Pound => KG_PER_POUND,
            Self::Ounce => KG_PER_OUNCE,
        }
    }

    pub fn to_kg(self, value: f64) -> f64 {
        value * self.kg_factor()
    }

    pub fn from_kg(self, kg: f64) -> f64 {
        kg / self.kg_factor()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LengthUnit {
    Millimetre,
    Centimetre,
    Metre,
    Inch,
}

impl LengthUnit {
    pub fn parse(token: &str) -> Option<Self> {
        match token.trim().trim_end_matches('.').to_lowercase().as_str() {
            "mm" | "millimetre" | "millimetres" | "millimeter" | "millimeters" => Some(Self::Millimetre),
            "cm" | "centimetre" | "centimetres" | "centimeter" | "centimeters" => Some(Self::Centimetre),
            "m" | "metre" | "metres" | "meter" | "meters" => Some(Self::Metre),
            "in" | "inch" | "inches" | "\"" => Some(Self::Inch),
            _ => None,
        }
    }

    pub fn to_cm(self, value: f64) -> f64 {
        match self {
            Self::Millimetre => value / 10.0,
            Self::Centimetre => value,
            Self::Metre => value * 100.0,
            Self::Inch => value * 2.54,
        }
    }
}
