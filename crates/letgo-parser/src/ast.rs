use letgo_common::Span;

/// A complete program: the commands before the closing END.
#[derive(Debug, Clone, PartialEq)]
pub struct Program {
    pub commands: Vec<Command>,
    pub span: Span,
}

impl Program {
    /// Labels declared anywhere in the program, in declaration order.
    pub fn labels(&self) -> Vec<&str> {
        let mut labels = Vec::new();
        for command in &self.commands {
            command.collect_labels(&mut labels);
        }
        labels
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// `name: command`. A label may prefix any command, including another label.
    Labeled {
        label: String,
        command: Box<Command>,
        span: Span,
    },
    /// LET name := expr
    Let {
        target: String,
        value: Expr,
        span: Span,
    },
    /// GO TO label
    Goto { target: String, span: Span },
    /// GO TO n OF label, label, ...
    ComputedGoto {
        index: i32,
        targets: Vec<String>,
        span: Span,
    },
    /// READ name, name, ...
    Read { targets: Vec<String>, span: Span },
    /// PRINT expr, expr, ...
    Print { values: Vec<Expr>, span: Span },
    /// IF lhs op rhs THEN command ELSE command
    If {
        lhs: Expr,
        op: RelOp,
        rhs: Expr,
        then_branch: Box<Command>,
        else_branch: Box<Command>,
        span: Span,
    },
}

impl Command {
    pub fn span(&self) -> Span {
        match self {
            Command::Labeled { span, .. }
            | Command::Let { span, .. }
            | Command::Goto { span, .. }
            | Command::ComputedGoto { span, .. }
            | Command::Read { span, .. }
            | Command::Print { span, .. }
            | Command::If { span, .. } => *span,
        }
    }

    fn collect_labels<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            Command::Labeled { label, command, .. } => {
                out.push(label);
                command.collect_labels(out);
            }
            Command::If {
                then_branch,
                else_branch,
                ..
            } => {
                then_branch.collect_labels(out);
                else_branch.collect_labels(out);
            }
            _ => {}
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Variable { name: String, span: Span },
    /// Digits as written; the checker never needs their value.
    Number { text: String, span: Span },
    /// `( expr )`
    Group { inner: Box<Expr>, span: Span },
    /// One link of a left-to-right operator chain.
    Binary {
        op: BinOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
        span: Span,
    },
}

impl Expr {
    pub fn span(&self) -> Span {
        match self {
            Expr::Variable { span, .. }
            | Expr::Number { span, .. }
            | Expr::Group { span, .. }
            | Expr::Binary { span, .. } => *span,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelOp {
    Eq,
    Gt,
    Lt,
    Ge,
    Le,
}
