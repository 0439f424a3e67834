// Source regeneration from the CST
// Every node writes its tokens' prefixes and texts in order, which reproduces
// the parsed file exactly as long as the tree was not edited.

use super::*;

/// Trait for nodes that can write back their source text
pub trait ToSource {
    fn write_source(&self, out: &mut String);

    fn to_source(&self) -> String {
        let mut out = String::new();
        self.write_source(&mut out);
        out
    }
}

impl ToSource for Token {
    fn write_source(&self, out: &mut String) {
        out.push_str(&self.prefix);
        out.push_str(&self.text);
    }
}

impl ToSource for Item {
    fn write_source(&self, out: &mut String) {
        match self {
            Item::Token(token) => token.write_source(out),
            Item::Group(group) => group.write_source(out),
        }
    }
}

impl ToSource for Element {
    fn write_source(&self, out: &mut String) {
        self.items.write_source(out);
        if let Some(comma) = &self.comma {
            comma.write_source(out);
        }
    }
}

impl ToSource for Group {
    fn write_source(&self, out: &mut String) {
        self.open.write_source(out);
        for element in &self.elements {
            element.write_source(out);
        }
        self.close.write_source(out);
    }
}

impl<T: ToSource> ToSource for [T] {
    fn write_source(&self, out: &mut String) {
        for node in self {
            node.write_source(out);
        }
    }
}

impl<T: ToSource> ToSource for Vec<T> {
    fn write_source(&self, out: &mut String) {
        self.as_slice().write_source(out);
    }
}

impl ToSource for Block {
    fn write_source(&self, out: &mut String) {
        self.indent.write_source(out);
        self.body.write_source(out);
        self.dedent.write_source(out);
    }
}

impl ToSource for Statement {
    fn write_source(&self, out: &mut String) {
        match self {
            Statement::Simple(simple) => {
                simple.items.write_source(out);
                simple.newline.write_source(out);
            }
            Statement::Compound(compound) => {
                compound.header.write_source(out);
                compound.newline.write_source(out);
                compound.block.write_source(out);
            }
            Statement::Class(class) => {
                class.header.write_source(out);
                class.newline.write_source(out);
                class.block.write_source(out);
            }
        }
    }
}

impl ToSource for Module {
    fn write_source(&self, out: &mut String) {
        self.body.write_source(out);
        self.end.write_source(out);
    }
}
