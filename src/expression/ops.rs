/// Single-argument operators, in the order the node factory draws them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    Negative,
    ToSquare,
    ArcSin,
    ArcCos,
    ArcTan,
    Sin,
    Cos,
    Tan,
    Log,
    Log10,
    Exp,
    Reciprocal,
    Sqrt,
    PowerOf10,
    PowerOf2,
    Cosh,
    Sinh,
    Tanh,
    ArcCosh,
    ArcSinh,
    ArcTanh,
}

impl UnaryOp {
    pub const ALL: [UnaryOp; 21] = [
        UnaryOp::Negative,
        UnaryOp::ToSquare,
        UnaryOp::ArcSin,
        UnaryOp::ArcCos,
        UnaryOp::ArcTan,
        UnaryOp::Sin,
        UnaryOp::Cos,
        UnaryOp::Tan,
        UnaryOp::Log,
        UnaryOp::Log10,
        UnaryOp::Exp,
        UnaryOp::Reciprocal,
        UnaryOp::Sqrt,
        UnaryOp::PowerOf10,
        UnaryOp::PowerOf2,
        UnaryOp::Cosh,
        UnaryOp::Sinh,
        UnaryOp::Tanh,
        UnaryOp::ArcCosh,
        UnaryOp::ArcSinh,
        UnaryOp::ArcTanh,
    ];

    /// Raw result of the operator, possibly non-finite.
    pub fn calculate(self, a: f64) -> f64 {
        match self {
            UnaryOp::Negative => -a,
            UnaryOp::ToSquare => a * a,
            UnaryOp::ArcSin => a.asin(),
            UnaryOp::ArcCos => a.acos(),
            UnaryOp::ArcTan => a.atan(),
            UnaryOp::Sin => a.sin(),
            UnaryOp::Cos => a.cos(),
            UnaryOp::Tan => a.tan(),
            UnaryOp::Log => a.ln(),
            UnaryOp::Log10 => a.log10(),
            UnaryOp::Exp => a.exp(),
            UnaryOp::Reciprocal => 1.0 / a,
            UnaryOp::Sqrt => a.sqrt(),
            UnaryOp::PowerOf10 => 10f64.powf(a),
            UnaryOp::PowerOf2 => a.exp2(),
            UnaryOp::Cosh => a.cosh(),
            UnaryOp::Sinh => a.sinh(),
            UnaryOp::Tanh => a.tanh(),
            UnaryOp::ArcCosh => a.acosh(),
            UnaryOp::ArcSinh => a.asinh(),
            UnaryOp::ArcTanh => a.atanh(),
        }
    }

    /// Function name used in the display form, `None` for the prefix minus.
    pub fn function_name(self) -> Option<&'static str> {
        let name = match self {
            UnaryOp::Negative => return None,
            UnaryOp::ToSquare => "sqr",
            UnaryOp::ArcSin => "asin",
            UnaryOp::ArcCos => "acos",
            UnaryOp::ArcTan => "atan",
            UnaryOp::Sin => "sin",
            UnaryOp::Cos => "cos",
            UnaryOp::Tan => "tan",
            UnaryOp::Log => "log",
            UnaryOp::Log10 => "log10",
            UnaryOp::Exp => "exp",
            UnaryOp::Reciprocal => "inv",
            UnaryOp::Sqrt => "sqrt",
            UnaryOp::PowerOf10 => "pow10",
            UnaryOp::PowerOf2 => "pow2",
            UnaryOp::Cosh => "cosh",
            UnaryOp::Sinh => "sinh",
            UnaryOp::Tanh => "tanh",
            UnaryOp::ArcCosh => "acosh",
            UnaryOp::ArcSinh => "asinh",
            UnaryOp::ArcTanh => "atanh",
        };
        Some(name)
    }

    /// Node kind name of the tree text format.
    pub fn kind_name(self) -> &'static str {
        match self {
            UnaryOp::Negative => "NegativeNode",
            UnaryOp::ToSquare => "ToSquareNode",
            UnaryOp::ArcSin => "ArcSinNode",
            UnaryOp::ArcCos => "ArcCosNode",
            UnaryOp::ArcTan => "ArcTanNode",
            UnaryOp::Sin => "SinNode",
            UnaryOp::Cos => "CosNode",
            UnaryOp::Tan => "TanNode",
            UnaryOp::Log => "LogNode",
            UnaryOp::Log10 => "Log10Node",
            UnaryOp::Exp => "ExpNode",
            UnaryOp::Reciprocal => "ReciprocalNode",
            UnaryOp::Sqrt => "SqrtNode",
            UnaryOp::PowerOf10 => "PowerOf10Node",
            UnaryOp::PowerOf2 => "PowerOf2Node",
            UnaryOp::Cosh => "CoshNode",
            UnaryOp::Sinh => "SinhNode",
            UnaryOp::Tanh => "TanhNode",
            UnaryOp::ArcCosh => "ArcCoshNode",
            UnaryOp::ArcSinh => "ArcSinhNode",
            UnaryOp::ArcTanh => "ArcTanhNode",
        }
    }

    pub fn from_kind_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|op| op.kind_name() == name)
    }
}

/// Two-argument operators, in the order the node factory draws them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    Plus,
    Multiply,
    Divide,
    Minus,
    Power,
}

impl BinaryOp {
    pub const ALL: [BinaryOp; 5] = [
        BinaryOp::Plus,
        BinaryOp::Multiply,
        BinaryOp::Divide,
        BinaryOp::Minus,
        BinaryOp::Power,
    ];

    pub fn calculate(self, a: f64, b: f64) -> f64 {
        match self {
            BinaryOp::Plus => a + b,
            BinaryOp::Multiply => a * b,
            BinaryOp::Divide => a / b,
            BinaryOp::Minus => a - b,
            BinaryOp::Power => a.powf(b),
        }
    }

    pub fn symbol(self) -> char {
        match self {
            BinaryOp::Plus => '+',
            BinaryOp::Multiply => '*',
            BinaryOp::Divide => '/',
            BinaryOp::Minus => '-',
            BinaryOp::Power => '^',
        }
    }

    pub fn is_commutative(self) -> bool {
        matches!(self, BinaryOp::Plus | BinaryOp::Multiply)
    }

    pub fn kind_name(self) -> &'static str {
        match self {
            BinaryOp::Plus => "PlusNode",
            BinaryOp::Multiply => "MultiplicationNode",
            BinaryOp::Divide => "DivisionNode",
            BinaryOp::Minus => "MinusNode",
            BinaryOp::Power => "PowerNode",
        }
    }

    pub fn from_kind_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|op| op.kind_name() == name)
    }
}
